// src/services/certificate.rs

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, Greyscale, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions,
    Point, Pt, Rgb, TextItem,
};

use crate::error::AppError;

/// Everything printed on a certificate.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    pub attempt_id: String,
    pub student_name: String,
    pub score: i64,
    pub total_questions: i64,
    pub issued_at: DateTime<Utc>,
}

/// Produces and serves completion certificates.
#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    /// Produces the artifact and returns its handle (a file name).
    async fn issue(&self, request: &CertificateRequest) -> Result<String, AppError>;

    /// Returns the artifact bytes for `attempt_id`, if one was issued.
    async fn load(&self, attempt_id: &str) -> Result<Option<Vec<u8>>, AppError>;
}

/// Writes one-page PDF certificates into a directory.
#[derive(Debug, Clone)]
pub struct PdfCertificateIssuer {
    dir: PathBuf,
}

impl PdfCertificateIssuer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_name(attempt_id: &str) -> String {
        format!("certificate_{}.pdf", attempt_id)
    }

    /// Attempt ids are UUIDs; anything else never reaches the filesystem.
    fn path_for(&self, attempt_id: &str) -> Option<PathBuf> {
        let id = uuid::Uuid::parse_str(attempt_id).ok()?;
        Some(self.dir.join(Self::file_name(&id.to_string())))
    }

    pub fn render(request: &CertificateRequest) -> Vec<u8> {
        let mut document = PdfDocument::new("Certificate of Completion");
        let mut ops = Vec::new();

        let accent = Color::Rgb(Rgb {
            r: 0.16,
            g: 0.4,
            b: 0.69,
            icc_profile: None,
        });
        let text = Color::Greyscale(Greyscale::new(0.08, None));

        push_text(
            &mut ops,
            (35.0, 250.0),
            BuiltinFont::HelveticaBold,
            30.0,
            "Certificate of Completion".to_string(),
            &accent,
        );
        push_line(&mut ops, (35.0, 243.0), (175.0, 243.0));
        push_text(
            &mut ops,
            (35.0, 220.0),
            BuiltinFont::Helvetica,
            16.0,
            "This is to certify that".to_string(),
            &text,
        );
        push_text(
            &mut ops,
            (35.0, 205.0),
            BuiltinFont::HelveticaBold,
            22.0,
            request.student_name.clone(),
            &text,
        );
        push_text(
            &mut ops,
            (35.0, 190.0),
            BuiltinFont::Helvetica,
            16.0,
            "has successfully completed the quiz with a score of".to_string(),
            &text,
        );
        push_text(
            &mut ops,
            (90.0, 170.0),
            BuiltinFont::HelveticaBold,
            26.0,
            format!("{}/{}", request.score, request.total_questions),
            &accent,
        );
        push_text(
            &mut ops,
            (35.0, 140.0),
            BuiltinFont::Helvetica,
            12.0,
            format!("Certificate ID: {}", request.attempt_id),
            &text,
        );
        push_text(
            &mut ops,
            (35.0, 132.0),
            BuiltinFont::Helvetica,
            12.0,
            format!("Date: {}", request.issued_at.format("%Y-%m-%d")),
            &text,
        );

        let page = PdfPage::new(Mm(210.0), Mm(297.0), ops);
        let mut warnings = Vec::new();
        document
            .with_pages(vec![page])
            .save(&PdfSaveOptions::default(), &mut warnings)
    }
}

fn push_text(
    ops: &mut Vec<Op>,
    at: (f32, f32),
    font: BuiltinFont,
    font_size: f32,
    text: String,
    color: &Color,
) {
    ops.extend([
        Op::StartTextSection,
        Op::SetTextCursor {
            pos: Point::new(Mm(at.0), Mm(at.1)),
        },
        Op::SetFontSizeBuiltinFont {
            size: Pt(font_size),
            font,
        },
        Op::SetLineHeight {
            lh: Pt(font_size * 1.2),
        },
        Op::SetFillColor { col: color.clone() },
        Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(text)],
            font,
        },
        Op::EndTextSection,
    ]);
}

fn push_line(ops: &mut Vec<Op>, from: (f32, f32), to: (f32, f32)) {
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![
                LinePoint {
                    p: Point::new(Mm(from.0), Mm(from.1)),
                    bezier: false,
                },
                LinePoint {
                    p: Point::new(Mm(to.0), Mm(to.1)),
                    bezier: false,
                },
            ],
            is_closed: false,
        },
    });
}

#[async_trait]
impl CertificateIssuer for PdfCertificateIssuer {
    async fn issue(&self, request: &CertificateRequest) -> Result<String, AppError> {
        let path = self
            .path_for(&request.attempt_id)
            .ok_or_else(|| AppError::IssuerUnavailable("attempt id is not a UUID".to_string()))?;

        let owned = request.clone();
        let bytes = tokio::task::spawn_blocking(move || Self::render(&owned))
            .await
            .map_err(|e| AppError::IssuerUnavailable(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::IssuerUnavailable(e.to_string()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::IssuerUnavailable(e.to_string()))?;

        tracing::info!("Issued certificate for attempt {}", request.attempt_id);
        Ok(Self::file_name(&request.attempt_id))
    }

    async fn load(&self, attempt_id: &str) -> Result<Option<Vec<u8>>, AppError> {
        let Some(path) = self.path_for(attempt_id) else {
            return Ok(None);
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::InternalServerError(e.to_string())),
        }
    }
}
