use crate::config::ProxyConfig;
use crate::proxy::{ProxyBinding, ProxyCriteria, ProxyError, ProxyProvisioner};

/// Provisioner that hands out endpoints fixed in configuration
#[derive(Debug, Clone)]
pub struct StaticProxies {
    binding: ProxyBinding,
}

impl StaticProxies {
    pub fn new(binding: ProxyBinding) -> Self {
        Self { binding }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let binding = ProxyBinding::parse(config.http.as_deref(), config.https.as_deref())?;
        Ok(Self::new(binding))
    }
}

impl ProxyProvisioner for StaticProxies {
    /// Regions are not checked; the configured endpoints are taken as-is
    async fn acquire(&self, _criteria: &ProxyCriteria) -> Result<ProxyBinding, ProxyError> {
        if self.binding.is_direct() {
            return Err(ProxyError::Unavailable(
                "no static proxy endpoint configured".to_string(),
            ));
        }
        Ok(self.binding.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_endpoints_returned() {
        let mut config = ProxyConfig::default();
        config.http = Some("http://10.0.0.1:3128".to_string());

        let provisioner = StaticProxies::from_config(&config).unwrap();
        let binding = provisioner
            .acquire(&ProxyCriteria::from_config(&config))
            .await
            .unwrap();
        assert_eq!(binding.endpoint_count(), 1);
    }

    #[tokio::test]
    async fn test_no_endpoints_is_unavailable() {
        let provisioner = StaticProxies::new(ProxyBinding::direct());
        let result = provisioner.acquire(&ProxyCriteria::default()).await;
        assert!(matches!(result, Err(ProxyError::Unavailable(_))));
    }
}
