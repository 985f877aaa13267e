//! Fixture HTTP server for exercising the client against canned responses.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use url::Url;

use crate::{BaseUrls, RequestSigner, VeracodeClient, VeracodeConfig, VeracodeError};

pub const APP_LIST_PATH: &str = "/api/5.0/getapplist.do";
pub const APP_INFO_PATH: &str = "/api/5.0/getappinfo.do";
pub const BUILD_INFO_PATH: &str = "/api/5.0/getbuildinfo.do";
pub const BUILD_LIST_PATH: &str = "/api/5.0/getbuildlist.do";
pub const XML_REPORT_PATH: &str = "/api/5.0/detailedreport.do";
pub const PDF_REPORT_PATH: &str = "/api/4.0/detailedreportpdf.do";

pub const APP_LIST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<applist xmlns="https://analysiscenter.veracode.com/schema/2.0/applist" applist_version="1.2" account_id="1">
  <app app_id="42" app_name="test_java" policy_updated_date="2023-05-01T10:00:00-04:00"/>
  <app app_id="43" app_name="test_java_legacy" policy_updated_date="2022-01-01T10:00:00-04:00"/>
  <app app_id="77" app_name="payments-api" policy_updated_date="2023-02-01T10:00:00-04:00"/>
</applist>"#;

pub const BUILD_INFO_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<buildinfo xmlns="https://analysiscenter.veracode.com/schema/4.0/buildinfo" buildinfo_version="1.5" account_id="1" app_id="42" build_id="9001">
  <build version="release-7" build_id="9001" submitter="ci" platform="Not Specified" lifecycle_stage="Not Specified" results_ready="true" policy_name="Default" policy_compliance_status="Pass" rules_status="Pass" grace_period_expired="false" scan_overdue="false" legacy_scan_engine="false">
    <analysis_unit analysis_type="Static" published_date="2023-06-01T10:00:00-04:00" status="Results Ready"/>
  </build>
</buildinfo>"#;

pub const BUILD_LIST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<buildlist xmlns="https://analysiscenter.veracode.com/schema/2.0/buildlist" buildlist_version="1.3" account_id="1" app_id="42" app_name="test_java">
  <build build_id="101" version="dast-jan" dynamic_scan_type="ds" policy_updated_date="2023-01-01"/>
  <build build_id="102" version="static-1" policy_updated_date="2023-07-01"/>
  <build build_id="103" version="dast-jun" dynamic_scan_type="ds" policy_updated_date="2023-06-15"/>
  <build build_id="104" version="static-2"/>
  <build build_id="105" version="dast-dec" dynamic_scan_type="ds" policy_updated_date="2022-12-31"/>
</buildlist>"#;

/// Canned response for one path.
#[derive(Debug, Clone)]
pub struct FixtureRoute {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl FixtureRoute {
    pub fn xml(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/xml; charset=UTF-8".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn pdf(body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: "application/pdf".to_string(),
            body: body.to_vec(),
        }
    }

    pub fn with_content_type(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.to_vec(),
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }
}

/// One request as seen by the fixture server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let target = format!("http://fixture{}?{}", self.path, self.query.clone().unwrap_or_default());
        Url::parse(&target)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

/// Signer that stamps a constant header, for tests that don't care about HMAC.
pub struct StaticSigner;

impl RequestSigner for StaticSigner {
    fn authorization(&self, _method: &str, _url: &Url) -> Result<String, VeracodeError> {
        Ok("VERACODE-HMAC-SHA-256 id=fixture,ts=0,nonce=00,sig=00".to_string())
    }
}

pub struct FixtureServer {
    address: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn start(routes: Vec<(&str, FixtureRoute)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        let routes: Arc<HashMap<String, FixtureRoute>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    serve_connection(stream, routes, recorded).await;
                });
            }
        });

        Self {
            address,
            requests,
            handle,
        }
    }

    pub fn base_urls(&self) -> BaseUrls {
        BaseUrls::new(format!("{}/api/", self.address), format!("{}/", self.address))
    }

    pub fn config(&self) -> VeracodeConfig {
        VeracodeConfig::new()
            .with_base_urls(self.base_urls())
            .with_timeouts(5, 10)
            .without_system_proxy()
    }

    pub fn client(&self) -> VeracodeClient {
        VeracodeClient::new(self.config(), Arc::new(StaticSigner)).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    routes: Arc<HashMap<String, FixtureRoute>>,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => raw.extend_from_slice(&chunk[..n]),
        }
    }

    let head = String::from_utf8_lossy(&raw).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (target.clone(), None),
    };
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();

    recorded.lock().unwrap().push(RecordedRequest {
        method,
        path: path.clone(),
        query,
        headers,
    });

    let route = routes
        .get(&path)
        .cloned()
        .unwrap_or_else(|| FixtureRoute::status(404, "not found"));

    let reason = match route.status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let header = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        route.status,
        route.content_type,
        route.body.len()
    );
    let _ = stream.write_all(header.as_bytes()).await;
    let _ = stream.write_all(&route.body).await;
    let _ = stream.shutdown().await;
}
