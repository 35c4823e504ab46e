use crate::error::{
    Error,
    Result,
};
use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};

/// Poll record pushed to the audit service on creation.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPollRecord {
    pub title: String,
    pub options: Vec<String>,
    pub start_time: u64,
    pub end_time: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPoll {
    pub poll_id: u64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorOption {
    pub option_id: u64,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorPoll {
    pub id: u64,
    pub title: String,
    pub start_time: u64,
    pub end_time: u64,
    pub options: Vec<MirrorOption>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub poll_id: u64,
    pub option_index: u64,
    pub voter: String,
    pub voted_at: u64,
}

/// Best-effort off-chain copy of poll and vote data.
///
/// Never load-bearing: the on-chain view is correct with this service
/// unreachable, and every failure is observed only by the log.
#[async_trait]
pub trait AuditMirror: Send + Sync {
    async fn create_poll(&self, poll: &NewPollRecord) -> Result<u64>;

    async fn polls(&self) -> Result<Vec<MirrorPoll>>;

    async fn record_vote(&self, vote: &VoteRecord) -> Result<()>;
}

/// HTTP client for the audit service.
#[derive(Clone, Debug)]
pub struct HttpAuditMirror {
    base: String,
}

impl HttpAuditMirror {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl AuditMirror for HttpAuditMirror {
    async fn create_poll(&self, poll: &NewPollRecord) -> Result<u64> {
        let mut res = surf::post(self.url("/polls"))
            .body(surf::Body::from_json(poll).map_err(http_err)?)
            .await
            .map_err(http_err)?;
        check_status(&res)?;
        let created: CreatedPoll =
            res.body_json().await.map_err(http_err)?;
        Ok(created.poll_id)
    }

    async fn polls(&self) -> Result<Vec<MirrorPoll>> {
        let mut res =
            surf::get(self.url("/polls")).await.map_err(http_err)?;
        check_status(&res)?;
        res.body_json().await.map_err(http_err)
    }

    async fn record_vote(&self, vote: &VoteRecord) -> Result<()> {
        let res = surf::post(self.url("/polls/vote"))
            .body(surf::Body::from_json(vote).map_err(http_err)?)
            .await
            .map_err(http_err)?;
        check_status(&res)?;
        Ok(())
    }
}

fn check_status(res: &surf::Response) -> Result<()> {
    if res.status().is_success() {
        Ok(())
    } else {
        Err(Error::Transport(format!(
            "audit mirror returned {}",
            res.status()
        )))
    }
}

fn http_err(e: surf::Error) -> Error {
    Error::Transport(e.to_string())
}
