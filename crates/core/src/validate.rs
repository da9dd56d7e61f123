use thiserror::Error;

use crate::domain::review::AttachmentMeta;

/// Hard ceiling for an uploaded resume, in bytes (2 MiB).
pub const MAX_RESUME_BYTES: u64 = 2 * 1024 * 1024;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AttachmentRejection {
    #[error("no attachment present")]
    Missing,
    #[error("attachment `{filename}` ({content_type}) is not a PDF")]
    NotPdf { filename: String, content_type: String },
    #[error("attachment `{filename}` is {size_bytes} bytes, over the {limit_bytes} byte ceiling")]
    TooLarge { filename: String, size_bytes: u64, limit_bytes: u64 },
}

/// Checks an uploaded attachment against the resume policy. A file counts as a
/// PDF when its declared content type is `application/pdf` OR its name ends in
/// `.pdf` (case-insensitive); a mislabeled file with a `.pdf` extension passes.
/// Metadata only, the content is never fetched.
pub fn validate_resume_attachment(
    attachment: Option<&AttachmentMeta>,
) -> Result<(), AttachmentRejection> {
    let Some(attachment) = attachment else {
        return Err(AttachmentRejection::Missing);
    };

    let declared_pdf =
        attachment.content_type.as_deref().is_some_and(|value| value == PDF_CONTENT_TYPE);
    let named_pdf = attachment.filename.to_ascii_lowercase().ends_with(".pdf");
    if !declared_pdf && !named_pdf {
        return Err(AttachmentRejection::NotPdf {
            filename: attachment.filename.clone(),
            content_type: attachment.content_type.clone().unwrap_or_else(|| "unknown".to_owned()),
        });
    }

    if attachment.size_bytes > MAX_RESUME_BYTES {
        return Err(AttachmentRejection::TooLarge {
            filename: attachment.filename.clone(),
            size_bytes: attachment.size_bytes,
            limit_bytes: MAX_RESUME_BYTES,
        });
    }

    Ok(())
}

/// Formats a byte count in MiB with two decimals, for user-facing messages.
pub fn format_size_mib(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid email address: `{rejected}`")]
pub struct EmailRejection {
    pub rejected: String,
}

/// Permissive syntactic email check: exactly one `@`, a non-empty local part,
/// and a domain with at least one interior `.`, every character being
/// non-whitespace and non-`@`. No deliverability or DNS verification.
///
/// Returns the trimmed address on success.
pub fn validate_email(raw: &str) -> Result<String, EmailRejection> {
    let trimmed = raw.trim();
    let reject = || EmailRejection { rejected: trimmed.to_owned() };

    let Some((local, domain)) = trimmed.split_once('@') else {
        return Err(reject());
    };
    if local.is_empty() || domain.is_empty() {
        return Err(reject());
    }
    if local.chars().chain(domain.chars()).any(|ch| ch == '@' || ch.is_whitespace()) {
        return Err(reject());
    }

    let has_interior_dot =
        domain.char_indices().any(|(index, ch)| ch == '.' && index > 0 && index + 1 < domain.len());
    if !has_interior_dot {
        return Err(reject());
    }

    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use crate::domain::review::AttachmentMeta;

    use super::{
        format_size_mib, validate_email, validate_resume_attachment, AttachmentRejection,
        MAX_RESUME_BYTES,
    };

    fn attachment(filename: &str, content_type: Option<&str>, size_bytes: u64) -> AttachmentMeta {
        AttachmentMeta {
            filename: filename.to_owned(),
            content_type: content_type.map(str::to_owned),
            size_bytes,
            url: "https://cdn.example/resume".to_owned(),
        }
    }

    #[test]
    fn accepts_pdf_by_content_type() {
        let att = attachment("resume.bin", Some("application/pdf"), 1024);
        assert_eq!(validate_resume_attachment(Some(&att)), Ok(()));
    }

    #[test]
    fn accepts_pdf_by_extension_even_when_mislabeled() {
        let att = attachment("Resume.PDF", Some("application/octet-stream"), 1024);
        assert_eq!(validate_resume_attachment(Some(&att)), Ok(()));
    }

    #[test]
    fn rejects_missing_attachment() {
        assert_eq!(validate_resume_attachment(None), Err(AttachmentRejection::Missing));
    }

    #[test]
    fn rejects_non_pdf_with_offending_metadata() {
        let att = attachment("resume.docx", Some("application/msword"), 1024);
        let rejection = validate_resume_attachment(Some(&att)).expect_err("docx must fail");
        assert_eq!(
            rejection,
            AttachmentRejection::NotPdf {
                filename: "resume.docx".to_owned(),
                content_type: "application/msword".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_oversized_file_and_accepts_at_the_boundary() {
        let at_limit = attachment("resume.pdf", Some("application/pdf"), MAX_RESUME_BYTES);
        assert_eq!(validate_resume_attachment(Some(&at_limit)), Ok(()));

        let over = attachment("resume.pdf", Some("application/pdf"), MAX_RESUME_BYTES + 1);
        let rejection = validate_resume_attachment(Some(&over)).expect_err("oversized must fail");
        assert!(matches!(rejection, AttachmentRejection::TooLarge { size_bytes, .. } if size_bytes == MAX_RESUME_BYTES + 1));
    }

    #[test]
    fn size_is_reported_in_mib_with_two_decimals() {
        assert_eq!(format_size_mib(3 * 1024 * 1024), "3.00");
        assert_eq!(format_size_mib(1_572_864), "1.50");
    }

    #[test]
    fn accepts_plain_addresses_and_trims_whitespace() {
        assert_eq!(validate_email(" a@b.co "), Ok("a@b.co".to_owned()));
        assert_eq!(validate_email("first.last@sub.example.org"), Ok("first.last@sub.example.org".to_owned()));
    }

    #[test]
    fn rejects_addresses_without_exactly_one_at_sign() {
        for bad in ["plainaddress", "a@@b.co", "a@b@c.co", "@b.co", "a@"] {
            let rejection = validate_email(bad).expect_err(bad);
            assert_eq!(rejection.rejected, bad);
        }
    }

    #[test]
    fn rejects_domains_without_an_interior_dot() {
        for bad in ["a@bco", "a@.co", "a@b."] {
            assert!(validate_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn rejects_whitespace_inside_either_part() {
        assert!(validate_email("a b@c.co").is_err());
        assert!(validate_email("a@b c.co").is_err());
    }
}
