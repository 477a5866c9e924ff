use std::time::Duration;

use feira_marker_models::{Marker, MarkerKind, OptimizationResult};
use itertools::Itertools;
use miette::{bail, miette, IntoDiagnostic, Result, WrapErr};
use tracing::{debug, info};
use url::Url;

pub const FIND_OPTIMAL_LOCATION_PATH: &str = "find-optimal-location/";

/// Blocking client of the optimisation service. One request per submission, no retry.
#[derive(Clone)]
pub struct SubmissionClient {
    agent: ureq::Agent,
    base: Url,
}

impl SubmissionClient {
    /// Without a timeout a request waits for as long as the service computes.
    pub fn new(base: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut base: Url = base
            .parse()
            .map_err(|e| miette!("{} is not a valid url: {}", base, e))?;
        if base.cannot_be_a_base() {
            bail!("{base} cannot be used as a base url");
        }
        // join() would otherwise replace the last path segment of the base
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            agent: builder.build(),
            base,
        })
    }

    pub fn endpoint(&self) -> Result<Url> {
        self.base
            .join(FIND_OPTIMAL_LOCATION_PATH)
            .map_err(|e| miette!("error joining url: {e}"))
    }

    /// Posts the markers and returns the body as the service sent it.
    pub fn submit_raw(&self, markers: &[Marker]) -> Result<serde_json::Value> {
        let url = self.endpoint()?;
        info!(%url, "submitting {} markers", markers.len());
        match self.agent.post(url.as_str()).send_json(markers) {
            Ok(response) => {
                debug!(status = response.status(), "optimisation service answered");
                response
                    .into_json()
                    .into_diagnostic()
                    .wrap_err("optimisation service answer is not json")
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                bail!(
                    "optimisation service answered {code}: {}",
                    error_detail(&body)
                )
            }
            Err(e) => Err(e)
                .into_diagnostic()
                .wrap_err_with(|| format!("failed to reach the optimisation service at {url}")),
        }
    }

    pub fn find_optimal_location(&self, markers: &[Marker]) -> Result<OptimizationResult> {
        let raw = self.submit_raw(markers)?;
        serde_json::from_value(raw)
            .into_diagnostic()
            .wrap_err("unexpected answer from the optimisation service")
    }
}

/// The service reports errors as `{"detail": ...}`, either a sentence or a list of field errors.
fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.chars().take(200).collect();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|item| match item.get("msg") {
                Some(serde_json::Value::String(msg)) => msg.clone(),
                _ => item.to_string(),
            })
            .join("; "),
        Some(other) => other.to_string(),
        None => value.to_string(),
    }
}

/// Same checks the service does before optimising, so that the user is told without a round trip.
pub fn validate_for_submission(markers: &[Marker]) -> Result<()> {
    for (i, marker) in markers.iter().enumerate() {
        if !marker.coords.is_valid() {
            bail!("marker {} has no valid coordinates ({})", i + 1, marker.coords);
        }
        if marker.quantidade < 0 {
            bail!("marker {} has a negative quantidade", i + 1);
        }
    }
    let has = |kind: MarkerKind| markers.iter().any(|m| m.kind == kind);
    if !has(MarkerKind::Produtor) || !has(MarkerKind::Mercado) {
        bail!("at least one produtor and one mercado are needed");
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use feira_marker_models::Coords;
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        sync::mpsc,
    };

    /// Answers exactly one request with `status` and `body`, and sends back what it received.
    fn one_shot_server(
        status: &'static str,
        body: &'static str,
    ) -> (String, mpsc::Receiver<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();
            let mut stream = reader.into_inner();
            write!(stream, "HTTP/1.1 {status}\r\nContent-Type: application/json\r\n").unwrap();
            write!(stream, "Content-Length: {}\r\n", body.len()).unwrap();
            write!(stream, "Connection: close\r\n\r\n{body}").unwrap();
            stream.flush().unwrap();
            sender
                .send((request_line, String::from_utf8(request_body).unwrap()))
                .unwrap();
        });
        (format!("http://{addr}"), receiver)
    }

    fn markers() -> Vec<Marker> {
        let mut producer = Marker::new(MarkerKind::Produtor, Coords::new(-23.5, -46.6));
        producer.frutas = vec!["Manga".to_string()];
        producer.quantidade = 10;
        let mut market = Marker::new(MarkerKind::Mercado, Coords::new(-23.55, -46.65));
        market.quantidade = 8;
        vec![producer, market]
    }

    #[test]
    fn posts_markers_and_parses_the_answer() {
        let (base, received) = one_shot_server(
            "200 OK",
            r#"{"optimal_location_coord":{"lat":-23.52,"lng":-46.63},"total_cost":"99.50","routes":[[[-23.5,-46.6],[-23.52,-46.63]]]}"#,
        );
        let client = SubmissionClient::new(&base, Some(Duration::from_secs(5))).unwrap();
        let result = client.find_optimal_location(&markers()).unwrap();
        assert_eq!(result.total_cost, 99.5);
        assert_eq!(result.optimal_location_coord, Coords::new(-23.52, -46.63));
        assert_eq!(result.routes.len(), 1);

        let (request_line, body) = received.recv().unwrap();
        assert!(request_line.starts_with("POST /find-optimal-location/ "));
        let sent: serde_json::Value = serde_json::from_str(&body).unwrap();
        similar_asserts::assert_eq!(
            sent,
            serde_json::json!([
                {"type": "produtor", "coords": {"lat": -23.5, "lng": -46.6}, "frutas": ["Manga"], "quantidade": 10},
                {"type": "mercado", "coords": {"lat": -23.55, "lng": -46.65}, "frutas": [], "quantidade": 8}
            ])
        );
    }

    #[test]
    fn error_status_carries_the_detail() {
        let (base, _received) = one_shot_server(
            "400 Bad Request",
            r#"{"detail":"Você precisa de pelo menos um produtor e um mercado."}"#,
        );
        let client = SubmissionClient::new(&base, Some(Duration::from_secs(5))).unwrap();
        let e = client.submit_raw(&markers()).unwrap_err();
        let message = e.to_string();
        assert!(message.contains("400"), "{message}");
        assert!(message.contains("pelo menos um produtor"), "{message}");
    }

    #[test]
    fn base_path_is_kept() {
        let client = SubmissionClient::new("http://example.org/api", None).unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://example.org/api/find-optimal-location/"
        );
        let client = SubmissionClient::new("http://example.org", None).unwrap();
        assert_eq!(
            client.endpoint().unwrap().as_str(),
            "http://example.org/find-optimal-location/"
        );
    }

    #[test]
    fn invalid_base_url() {
        assert!(SubmissionClient::new("not a url", None).is_err());
    }

    #[test]
    fn field_errors_are_joined() {
        let body = r#"{"detail":[{"loc":["body",0,"type"],"msg":"type inválido"},{"msg":"quantidade deve ser >= 0"}]}"#;
        assert_eq!(
            error_detail(body),
            "type inválido; quantidade deve ser >= 0"
        );
        assert_eq!(error_detail("Internal Server Error"), "Internal Server Error");
    }

    #[test]
    fn preflight() {
        assert!(validate_for_submission(&markers()).is_ok());
        assert!(validate_for_submission(&markers()[..1]).is_err());
        assert!(validate_for_submission(&[]).is_err());

        let mut bad = markers();
        bad[1].coords.lat = f64::NAN;
        assert!(validate_for_submission(&bad).is_err());

        let mut bad = markers();
        bad[0].coords.lng = 444.0;
        assert!(validate_for_submission(&bad).is_err());

        let mut bad = markers();
        bad[1].coords.lat = -91.0;
        assert!(validate_for_submission(&bad).is_err());

        let mut bad = markers();
        bad[0].quantidade = -1;
        assert!(validate_for_submission(&bad).is_err());
    }
}
