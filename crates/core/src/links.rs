//! Share and approval link construction: a fixed base path plus the opaque
//! token. The exact scheme/host is a product decision carried in config.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkBuilder {
    base_url: String,
}

impl LinkBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Guest-facing offer link, long-lived.
    pub fn share_link(&self, share_token: &str) -> String {
        format!("{}/offer/{share_token}", self.base_url)
    }

    /// Approver-facing decision link, single-use per approval.
    pub fn approval_link(&self, approval_token: &str) -> String {
        format!("{}/approve/{approval_token}", self.base_url)
    }
}
