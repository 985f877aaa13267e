//! Detailed report download.
//!
//! The XML variant lives on `5.0/detailedreport.do`, the PDF variant only on
//! `4.0/detailedreportpdf.do`. Bodies of both formats are written byte for
//! byte as received, never re-encoded.

use log::info;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{ApiVersion, ReportBody, VeracodeClient, VeracodeError};

/// Detailed report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Xml,
    Pdf,
}

impl ReportFormat {
    /// API version segment and endpoint name serving this format.
    #[must_use]
    pub fn endpoint(&self) -> (ApiVersion, &'static str) {
        match self {
            ReportFormat::Xml => (ApiVersion::V5, "detailedreport.do"),
            ReportFormat::Pdf => (ApiVersion::V4, "detailedreportpdf.do"),
        }
    }

    /// Lowercase file extension
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Xml => "xml",
            ReportFormat::Pdf => "pdf",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Xml => "XML",
            ReportFormat::Pdf => "PDF",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = VeracodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XML" => Ok(ReportFormat::Xml),
            "PDF" => Ok(ReportFormat::Pdf),
            _ => Err(VeracodeError::InvalidConfig(format!(
                "Unknown report format '{s}'. Valid values: XML, PDF"
            ))),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<prefix><app_id>_<build_id>_report.<ext>`
#[must_use]
pub fn report_filename(prefix: &str, app_id: &str, build_id: &str, format: ReportFormat) -> String {
    format!("{prefix}{app_id}_{build_id}_report.{}", format.extension())
}

/// Create `dir` (and parents) and write `contents` to `dir/filename`,
/// replacing any existing file. Returns the resolved absolute path.
///
/// # Errors
///
/// Returns [`VeracodeError::Io`] on any file system failure.
pub async fn write_output(
    dir: &Path,
    filename: &str,
    contents: &[u8],
) -> Result<PathBuf, VeracodeError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(filename);
    tokio::fs::write(&path, contents).await?;
    Ok(tokio::fs::canonicalize(&path).await?)
}

/// Report API operations
pub struct ReportApi<'a> {
    client: &'a VeracodeClient,
}

impl<'a> ReportApi<'a> {
    pub fn new(client: &'a VeracodeClient) -> Self {
        Self { client }
    }

    /// Download the detailed report body.
    ///
    /// # Errors
    ///
    /// Any client error.
    pub async fn download_detailed_report(
        &self,
        app_id: &str,
        build_id: &str,
        format: ReportFormat,
    ) -> Result<ReportBody, VeracodeError> {
        let (version, endpoint) = format.endpoint();
        let url = self.client.xml_url(version, endpoint);
        self.client
            .get_report(&url, &[("build_id", build_id), ("app_id", app_id)], format)
            .await
    }

    /// Download the detailed report and save it under `output_dir`.
    ///
    /// # Errors
    ///
    /// Client errors, or [`VeracodeError::Io`] when the file cannot be written.
    pub async fn fetch_detailed_report(
        &self,
        app_id: &str,
        build_id: &str,
        format: ReportFormat,
        output_dir: &Path,
        prefix: &str,
    ) -> Result<PathBuf, VeracodeError> {
        info!("📥 Downloading {format} detailed report for build_id={build_id}");
        let body = self.download_detailed_report(app_id, build_id, format).await?;

        let filename = report_filename(prefix, app_id, build_id, format);
        let path = write_output(output_dir, &filename, body.as_bytes()).await?;
        info!("✅ Report saved to: {} ({} bytes)", path.display(), body.len());
        Ok(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::{FixtureRoute, FixtureServer, PDF_REPORT_PATH, XML_REPORT_PATH};
    use tempfile::TempDir;

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename("", "123", "456", ReportFormat::Xml), "123_456_report.xml");
        assert_eq!(
            report_filename("veracode_", "42", "9001", ReportFormat::Pdf),
            "veracode_42_9001_report.pdf"
        );
    }

    #[test]
    fn test_format_parsing_and_endpoints() {
        assert_eq!("xml".parse::<ReportFormat>().unwrap(), ReportFormat::Xml);
        assert_eq!("PDF".parse::<ReportFormat>().unwrap(), ReportFormat::Pdf);
        assert!("html".parse::<ReportFormat>().is_err());

        assert_eq!(ReportFormat::Xml.endpoint(), (ApiVersion::V5, "detailedreport.do"));
        assert_eq!(ReportFormat::Pdf.endpoint(), (ApiVersion::V4, "detailedreportpdf.do"));
    }

    #[test]
    fn test_endpoint_urls_for_same_region() {
        let urls = crate::VeracodeRegion::European.base_urls();
        let (v, name) = ReportFormat::Pdf.endpoint();
        assert_eq!(
            urls.xml_endpoint(v, name),
            "https://analysiscenter.veracode.eu/api/4.0/detailedreportpdf.do"
        );
        let (v, name) = ReportFormat::Xml.endpoint();
        assert_eq!(
            urls.xml_endpoint(v, name),
            "https://analysiscenter.veracode.eu/api/5.0/detailedreport.do"
        );
    }

    #[test]
    fn test_write_output_into_a_file_path_fails() {
        let out = TempDir::new().unwrap();
        let blocker = out.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = tokio_test::block_on(write_output(&blocker, "r.xml", b"<r/>")).unwrap_err();
        assert!(matches!(err, VeracodeError::Io(_)));
        assert_eq!(std::fs::read(&blocker).unwrap(), b"x".to_vec());
    }

    #[tokio::test]
    async fn test_xml_report_saved_and_overwritten() {
        let out = TempDir::new().unwrap();
        let first = FixtureServer::start(vec![(
            XML_REPORT_PATH,
            FixtureRoute::xml("<detailedreport build_id=\"456\">first</detailedreport>"),
        )])
        .await;
        let client = first.client();

        let path = ReportApi::new(&client)
            .fetch_detailed_report("123", "456", ReportFormat::Xml, out.path(), "")
            .await
            .unwrap();
        assert!(path.is_absolute());
        assert_eq!(path.file_name().unwrap(), "123_456_report.xml");
        assert_eq!(path.parent().unwrap(), out.path().canonicalize().unwrap());
        assert!(std::fs::read_to_string(&path).unwrap().contains("first"));

        let pairs = first.requests()[0].query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("build_id".to_string(), "456".to_string()),
                ("app_id".to_string(), "123".to_string())
            ]
        );

        let second = FixtureServer::start(vec![(
            XML_REPORT_PATH,
            FixtureRoute::xml("<detailedreport build_id=\"456\">second</detailedreport>"),
        )])
        .await;
        let client = second.client();
        let again = ReportApi::new(&client)
            .fetch_detailed_report("123", "456", ReportFormat::Xml, out.path(), "")
            .await
            .unwrap();
        assert_eq!(again, path);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("second"));
        assert!(!contents.contains("first"));
    }

    #[tokio::test]
    async fn test_non_utf8_xml_report_is_saved_verbatim() {
        let latin1 =
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<detailedreport app_name=\"caf\xe9\"/>";
        for (build_id, content_type) in [("1", "text/xml; charset=ISO-8859-1"), ("2", "text/xml")] {
            let out = TempDir::new().unwrap();
            let server = FixtureServer::start(vec![(
                XML_REPORT_PATH,
                FixtureRoute::with_content_type(content_type, latin1),
            )])
            .await;
            let client = server.client();

            let path = ReportApi::new(&client)
                .fetch_detailed_report("7", build_id, ReportFormat::Xml, out.path(), "")
                .await
                .unwrap();
            assert_eq!(std::fs::read(&path).unwrap(), latin1.to_vec(), "content type {content_type}");
        }
    }

    #[tokio::test]
    async fn test_pdf_report_targets_v4_and_creates_directories() {
        let out = TempDir::new().unwrap();
        let nested = out.path().join("reports").join("nightly");
        let pdf = b"%PDF-1.7\n\x00\x01\x02\xff";
        let server = FixtureServer::start(vec![(PDF_REPORT_PATH, FixtureRoute::pdf(pdf))]).await;
        let client = server.client();

        let path = ReportApi::new(&client)
            .fetch_detailed_report("42", "9001", ReportFormat::Pdf, &nested, "veracode_")
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "veracode_42_9001_report.pdf");
        assert_eq!(std::fs::read(&path).unwrap(), pdf.to_vec());
        assert_eq!(server.requests()[0].path, PDF_REPORT_PATH);
    }

    #[tokio::test]
    async fn test_failed_download_writes_nothing() {
        let out = TempDir::new().unwrap();
        let server = FixtureServer::start(vec![(
            XML_REPORT_PATH,
            FixtureRoute::status(500, "boom"),
        )])
        .await;
        let client = server.client();

        let err = ReportApi::new(&client)
            .fetch_detailed_report("1", "2", ReportFormat::Xml, out.path(), "")
            .await
            .unwrap_err();
        assert!(matches!(err, VeracodeError::HttpStatus { status: 500, .. }));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }
}
