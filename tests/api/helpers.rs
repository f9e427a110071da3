use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde_json::{json, Value};

use url::Url;

use wiremock::matchers::any;
use wiremock::{Mock, MockServer, ResponseTemplate};

use ticket_response::app::{self, Services};
use ticket_response::client::{CaptchaClient, EmailClient};
use ticket_response::crypto::SigningKey;
use ticket_response::pdf::{LopdfMerger, PdfError, PdfRenderer, PdfResult, TicketDocument, TicketPdfRenderer};
use ticket_response::repo::{Location, MemoryStore, Region, User};
use ticket_response::settings::{AdminSettings, AuthSettings, PdfSettings, PrintMarker};

/// Knobs for a spawned app
#[derive(Debug, Clone)]
pub struct TestOptions {
    pub captcha_enabled: bool,
    pub demo_login: bool,
    pub print_marker: PrintMarker,
    pub render_fails: bool,
    pub page_size: i64,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            captcha_enabled: false,
            demo_login: true,
            print_marker: PrintMarker::Placeholder,
            render_fails: false,
            page_size: 50,
        }
    }
}

struct FailingRenderer;

impl PdfRenderer for FailingRenderer {
    fn render(&self, _document: &TicketDocument) -> PdfResult<Vec<u8>> {
        Err(PdfError::NoPages)
    }
}

/// Reference data every test app starts with
pub struct Seed {
    pub island: Region,
    pub north: Region,
    pub victoria: Location,
    pub prince_george: Location,
    pub staff: User,
}

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub store: Arc<MemoryStore>,
    pub seed: Seed,
    pub email_server: MockServer,
    pub captcha_server: MockServer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestOptions::default()).await
    }

    pub async fn spawn_with(options: TestOptions) -> Self {
        use rand::{distributions::Alphanumeric, Rng};

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(MemoryStore::new());
        let seed = {
            let island = store.add_region("Island").await;
            let north = store.add_region("North").await;
            let victoria = store.add_location("Victoria", island.id).await;
            let prince_george = store.add_location("Prince George", north.id).await;
            let staff = store.add_user("staff-idir", "Staff", "Member").await;
            Seed {
                island,
                north,
                victoria,
                prince_george,
                staff,
            }
        };

        let signing_key = {
            let rand_key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect();

            SigningKey::new(&Secret::new(rand_key)).expect("Failed to create crypto signing key")
        };

        let email_server = MockServer::start().await;
        let email_client = {
            let sender = "test@test.com"
                .parse()
                .expect("Failed to parse sender email address");
            let api_base_url =
                Url::parse(&email_server.uri()).expect("Failed to parse mock server uri");
            let api_auth_token = Secret::new("TestAuthorization".into());
            let api_timeout = Duration::from_secs(2);

            EmailClient::new(sender, api_timeout, api_base_url, api_auth_token)
                .expect("Failed to create email client")
        };

        let captcha_server = MockServer::start().await;
        let captcha = {
            let verify_url = Url::parse(&captcha_server.uri())
                .and_then(|url| url.join("siteverify"))
                .expect("Failed to parse mock server uri");

            CaptchaClient::new(
                options.captcha_enabled,
                "test-site-key".into(),
                Secret::new("test-secret".into()),
                verify_url,
                Duration::from_secs(2),
            )
            .expect("Failed to create captcha client")
        };

        let renderer: Arc<dyn PdfRenderer> = if options.render_fails {
            Arc::new(FailingRenderer)
        } else {
            Arc::new(TicketPdfRenderer::new())
        };

        let admin: AdminSettings = serde_json::from_value(json!({
            "page_size": options.page_size,
            "max_page_size": 100,
            "print_marker": options.print_marker,
            "placeholder_user_id": seed.staff.id,
        }))
        .expect("Failed to build admin settings");

        let services = Services {
            store: store.clone(),
            renderer,
            merger: Arc::new(LopdfMerger::new()),
            email_sender: Arc::new(email_client),
            captcha,
            signing_key,
            auth: AuthSettings {
                demo_login: options.demo_login,
                login_uri: Some("https://login.example.com".into()),
                logout_uri: None,
            },
            admin,
            pdf: PdfSettings {
                default_filename: "ticketResponse.pdf".into(),
            },
        };

        let server = app::run(listener, services).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::new();

        Self {
            addr,
            client,
            store,
            seed,
            email_server,
            captcha_server,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    /// Accept every email the app sends
    pub async fn mount_email_ok(&self) {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }

    pub async fn submit(&self, payload: &Value) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/v1/submit-form/")
            .json(payload)
            .send()
            .await
    }

    /// Submit the sample form and return the stored submission id
    pub async fn submit_sample(&self, last_name: &str, location_id: i64) -> i64 {
        let mut payload = sample_submission(location_id);
        payload["disputantName"]["last"] = json!(last_name);

        let res = self.submit(&payload).await.expect("Failed to execute request");
        assert_eq!(200, res.status().as_u16());

        let body: Value = res.json().await.expect("Failed to parse response");
        body["id"].as_i64().expect("Missing submission id")
    }

    pub async fn list_tickets(&self, query: &str) -> Value {
        self.request(Method::GET, &format!("api/v1/tickets/?{}", query))
            .send()
            .await
            .expect("Failed to execute request")
            .json()
            .await
            .expect("Failed to parse response")
    }

    /// Prepared PDF id of a stored submission
    pub async fn pdf_id(&self, ticket_id: i64) -> i64 {
        self.store
            .tickets()
            .await
            .into_iter()
            .find(|ticket| ticket.id == ticket_id)
            .and_then(|ticket| ticket.prepared_pdf_id)
            .expect("Submission has no prepared PDF")
    }

    pub async fn mark_printed(&self, pdf_ids: &[i64]) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/v1/printed/")
            .json(&json!({ "id": pdf_ids }))
            .send()
            .await
    }
}

/// The canonical valid submission
pub fn sample_submission(location_id: i64) -> Value {
    json!({
        "disputantName": {"first": "Jane", "last": "Doe"},
        "disputantEmail": "j@example.com",
        "ticketNumber": {"prefix": "ab", "suffix": "123"},
        "ticketDate": "2024-01-01",
        "hearingLocation": location_id,
        "hearingAttendance": "remotely",
        "disputeType": "allegation",
        "interpreter": "n",
        "witnesses": "y"
    })
}

/// `name=value` from a response's Set-Cookie header for `name`
pub fn set_cookie(res: &Response, name: &str) -> Option<String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or_default().trim().to_string())
        .find(|pair| pair.starts_with(&format!("{}=", name)))
}
