//! Issue context supplied by the issue-intake service

use serde::{Deserialize, Serialize};

/// Read-only description of the issue a session is resolving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueContext {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "userName", default)]
    pub user_name: String,
    #[serde(rename = "issueTitle", default)]
    pub issue_title: String,
    #[serde(rename = "issueDescription", default)]
    pub issue_description: String,
    #[serde(rename = "threadID")]
    pub thread_id: String,
    #[serde(rename = "imageURL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}
