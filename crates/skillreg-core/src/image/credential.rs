//! Registry credentials and host-based ranking.

use serde::{Deserialize, Serialize};

/// Kind of container registry a credential belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistryType {
    /// Amazon Elastic Container Registry
    Ecr,
    /// Google Container Registry
    Gcr,
    /// GitHub Container Registry
    Ghcr,
    /// Docker Hub
    DockerHub,
    /// Any other registry
    #[serde(other)]
    Other,
}

impl RegistryType {
    /// Whether an image host looks like it belongs to this registry type.
    pub fn matches_host(&self, host: &str) -> bool {
        match self {
            RegistryType::Ecr => host.contains(".ecr."),
            RegistryType::Gcr => host.contains("gcr.io"),
            RegistryType::Ghcr => host.contains("ghcr.io"),
            RegistryType::DockerHub => host == "hub.docker.com",
            RegistryType::Other => false,
        }
    }
}

/// Credential for one container registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredential {
    pub id: String,
    pub r#type: RegistryType,
    pub server_url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub service_account: Option<String>,
}

impl RegistryCredential {
    pub fn new(
        id: impl Into<String>,
        r#type: RegistryType,
        server_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            r#type,
            server_url: server_url.into(),
            username: None,
            password: None,
            service_account: None,
        }
    }

    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_service_account(mut self, service_account: impl Into<String>) -> Self {
        self.service_account = Some(service_account.into());
        self
    }

    /// Credentials without a secret are used anonymously.
    pub fn is_anonymous(&self) -> bool {
        self.password.as_deref().is_none_or(str::is_empty)
    }

    /// User name presented at login.
    ///
    /// Service-account credentials authenticate with an access token.
    pub fn login_user(&self) -> &str {
        match (&self.username, &self.service_account) {
            (Some(user), _) => user,
            (None, Some(_)) => "oauth2accesstoken",
            (None, None) => "",
        }
    }
}

/// Order credentials so the ones matching the image host come first.
///
/// The sort is stable: candidates of equal rank keep their input order.
pub fn rank_credentials(host: &str, credentials: &[RegistryCredential]) -> Vec<RegistryCredential> {
    let mut ranked = credentials.to_vec();
    ranked.sort_by_key(|c| if c.r#type.matches_host(host) { 0 } else { 1 });
    ranked
}

/// Drop credentials whose id was already seen, keeping the first occurrence.
pub fn dedup_credentials(credentials: Vec<RegistryCredential>) -> Vec<RegistryCredential> {
    let mut seen = std::collections::HashSet::new();
    credentials
        .into_iter()
        .filter(|c| seen.insert(c.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(id: &str, r#type: RegistryType) -> RegistryCredential {
        RegistryCredential::new(id, r#type, "https://registry.example.com")
    }

    fn ids(creds: &[RegistryCredential]) -> Vec<&str> {
        creds.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn matching_type_sorts_first() {
        let creds = vec![
            cred("hub", RegistryType::DockerHub),
            cred("ecr", RegistryType::Ecr),
            cred("gcr", RegistryType::Gcr),
        ];
        let ranked = rank_credentials("gcr.io", &creds);
        assert_eq!(ids(&ranked), vec!["gcr", "hub", "ecr"]);
    }

    #[test]
    fn ties_preserve_input_order() {
        let creds = vec![
            cred("other-1", RegistryType::Other),
            cred("ghcr-1", RegistryType::Ghcr),
            cred("other-2", RegistryType::Other),
            cred("ghcr-2", RegistryType::Ghcr),
        ];
        let ranked = rank_credentials("ghcr.io", &creds);
        assert_eq!(ids(&ranked), vec!["ghcr-1", "ghcr-2", "other-1", "other-2"]);

        let again = rank_credentials("ghcr.io", &creds);
        assert_eq!(ranked, again);
    }

    #[test]
    fn host_heuristics() {
        assert!(RegistryType::Ecr.matches_host("123.dkr.ecr.us-east-1.amazonaws.com"));
        assert!(RegistryType::Gcr.matches_host("eu.gcr.io"));
        assert!(RegistryType::Ghcr.matches_host("ghcr.io"));
        assert!(RegistryType::DockerHub.matches_host("hub.docker.com"));
        assert!(!RegistryType::DockerHub.matches_host("docker.io"));
        assert!(!RegistryType::Other.matches_host("gcr.io"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut second = cred("a", RegistryType::Gcr);
        second.server_url = "https://second".to_string();
        let deduped = dedup_credentials(vec![
            cred("a", RegistryType::Gcr),
            cred("b", RegistryType::Ecr),
            second,
        ]);
        assert_eq!(ids(&deduped), vec!["a", "b"]);
        assert_eq!(deduped[0].server_url, "https://registry.example.com");
    }

    #[test]
    fn unknown_type_deserializes_as_other() {
        let cred: RegistryCredential = serde_json::from_value(serde_json::json!({
            "id": "x",
            "type": "QUAY",
            "serverUrl": "quay.io"
        }))
        .unwrap();
        assert_eq!(cred.r#type, RegistryType::Other);
        assert!(cred.is_anonymous());
    }

    #[test]
    fn service_account_logs_in_with_token_user() {
        let cred = cred("gcr", RegistryType::Gcr).with_service_account("sa@example.iam");
        assert_eq!(cred.login_user(), "oauth2accesstoken");
    }
}
