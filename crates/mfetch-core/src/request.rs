//! Request template for one mirror.
//!
//! The session clones the template for every attempt and adds the `Range`
//! header itself; headers here are sent with every probe and chunk fetch.

use std::collections::HashMap;

/// Minimal request specification for one mirror of the object.
#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub url: String,
    /// HTTP method. Only `GET` passes pre-flight.
    pub method: String,
    /// Extra headers (e.g. authorization) sent with every request.
    pub headers: HashMap<String, String>,
}

impl MirrorRequest {
    /// A plain `GET` of `url` with no extra headers.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Host name of the URL, if it parses and has one.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_holds_url_and_headers() {
        let req = MirrorRequest::get("https://cdn.example.com/file.iso")
            .with_header("Authorization", "Bearer xyz");
        assert_eq!(req.method, "GET");
        assert_eq!(req.url, "https://cdn.example.com/file.iso");
        assert_eq!(req.headers.get("Authorization").unwrap(), "Bearer xyz");
        assert_eq!(req.host().as_deref(), Some("cdn.example.com"));
    }

    #[test]
    fn host_of_unparseable_url() {
        assert!(MirrorRequest::get("not a url").host().is_none());
        assert_eq!(
            MirrorRequest::get("http://127.0.0.1:8080/x").host().as_deref(),
            Some("127.0.0.1")
        );
    }
}
