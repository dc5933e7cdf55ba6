use crate::proxy::ProxyError;
use reqwest::{ClientBuilder, Proxy};
use std::fmt;
use url::Url;

/// The egress endpoints a run is bound to
///
/// Zero endpoints means direct egress. A binding is handed to the transport
/// by value when the client is built and is never changed afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyBinding {
    http: Option<Url>,
    https: Option<Url>,
}

impl ProxyBinding {
    /// A binding with no endpoints
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn new(http: Option<Url>, https: Option<Url>) -> Self {
        Self { http, https }
    }

    /// Builds a binding from endpoint strings
    pub fn parse(http: Option<&str>, https: Option<&str>) -> Result<Self, ProxyError> {
        let parse = |endpoint: &str| {
            Url::parse(endpoint)
                .map_err(|e| ProxyError::InvalidEndpoint(format!("{}: {}", endpoint, e)))
        };

        Ok(Self {
            http: http.map(parse).transpose()?,
            https: https.map(parse).transpose()?,
        })
    }

    /// Endpoint used for plain-HTTP targets
    pub fn http(&self) -> Option<&Url> {
        self.http.as_ref()
    }

    /// Endpoint used for HTTPS targets
    pub fn https(&self) -> Option<&Url> {
        self.https.as_ref()
    }

    pub fn is_direct(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }

    pub fn endpoint_count(&self) -> usize {
        usize::from(self.http.is_some()) + usize::from(self.https.is_some())
    }

    /// Applies the binding to a client builder
    ///
    /// Direct bindings also turn off proxy discovery from the environment, so
    /// ambient `HTTP_PROXY`-style settings never leak into the run.
    pub fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder, reqwest::Error> {
        if self.is_direct() {
            return Ok(builder.no_proxy());
        }

        let mut builder = builder;
        if let Some(endpoint) = &self.http {
            builder = builder.proxy(Proxy::http(endpoint.as_str())?);
        }
        if let Some(endpoint) = &self.https {
            builder = builder.proxy(Proxy::https(endpoint.as_str())?);
        }
        Ok(builder)
    }
}

impl fmt::Display for ProxyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_direct() {
            return write!(f, "direct");
        }

        let show = |endpoint: &Option<Url>| {
            endpoint
                .as_ref()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        write!(f, "http={} https={}", show(&self.http), show(&self.https))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_binding() {
        let binding = ProxyBinding::direct();
        assert!(binding.is_direct());
        assert_eq!(binding.endpoint_count(), 0);
        assert_eq!(binding.to_string(), "direct");
    }

    #[test]
    fn test_parse_two_endpoints() {
        let binding =
            ProxyBinding::parse(Some("http://10.0.0.1:3128"), Some("http://10.0.0.2:8080")).unwrap();
        assert_eq!(binding.endpoint_count(), 2);
        assert_eq!(binding.http().unwrap().port(), Some(3128));
        assert_eq!(binding.https().unwrap().port(), Some(8080));
        assert!(!binding.is_direct());
    }

    #[test]
    fn test_parse_invalid_endpoint() {
        let result = ProxyBinding::parse(Some("::not a url::"), None);
        assert!(matches!(result, Err(ProxyError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_apply_builds_client() {
        let binding = ProxyBinding::parse(Some("http://10.0.0.1:3128"), None).unwrap();
        let builder = binding.apply(reqwest::Client::builder()).unwrap();
        assert!(builder.build().is_ok());

        let builder = ProxyBinding::direct()
            .apply(reqwest::Client::builder())
            .unwrap();
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_display_partial_binding() {
        let binding = ProxyBinding::parse(None, Some("http://10.0.0.2:8080")).unwrap();
        assert_eq!(binding.to_string(), "http=- https=http://10.0.0.2:8080/");
    }
}
