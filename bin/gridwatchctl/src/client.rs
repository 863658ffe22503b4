//! ---
//! gw_section: "05-networking-external-interfaces"
//! gw_subsection: "module"
//! gw_type: "source"
//! gw_scope: "code"
//! gw_description: "HTTP client for the daemon REST API."
//! gw_version: "v0.0.0-prealpha"
//! gw_owner: "tbd"
//! ---
use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, Response};
use serde_json::{json, Value};

/// Thin blocking client for the daemon REST API.
pub struct ApiClient {
    http: Client,
    endpoint: String,
}

impl ApiClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to construct HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }

    pub fn status(&self) -> Result<Value> {
        self.get("/api/status")
    }

    pub fn poles(&self) -> Result<Value> {
        self.get("/api/poles")
    }

    pub fn pole(&self, pole_id: &str) -> Result<Value> {
        self.get(&format!("/api/poles/{pole_id}"))
    }

    pub fn alerts(&self) -> Result<Value> {
        self.get("/api/alerts")
    }

    pub fn notifications(&self) -> Result<Value> {
        self.get("/api/notifications")
    }

    pub fn control(&self, pole_id: &str, action: &str, operator: &str) -> Result<Value> {
        self.post(
            &format!("/api/poles/{pole_id}/{action}"),
            json!({ "operator": operator }),
        )
    }

    pub fn report_issue(&self, pole_id: &str, body: Value) -> Result<Value> {
        self.post(&format!("/api/poles/{pole_id}/issues"), body)
    }

    pub fn inject_fault(&self, pole_id: &str, fault: &str) -> Result<Value> {
        self.post(
            &format!("/api/poles/{pole_id}/inject"),
            json!({ "fault": fault }),
        )
    }

    pub fn dismiss_alert(&self, alert_id: &str) -> Result<Value> {
        let url = format!("{}/api/alerts/{}", self.endpoint, alert_id);
        let response = self
            .http
            .delete(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        Self::parse(response)
    }

    pub fn reset(&self) -> Result<Value> {
        self.post("/api/reset", json!({}))
    }

    fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        Self::parse(response)
    }

    fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .with_context(|| format!("request to {url} failed"))?;
        Self::parse(response)
    }

    fn parse(response: Response) -> Result<Value> {
        let status = response.status();
        let body: Value = response.json().unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(body);
        }
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("request rejected")
            .to_owned();
        Err(anyhow!("{} ({})", message, status))
    }
}
