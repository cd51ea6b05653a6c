use std::net::IpAddr;

/// Extract the client IP for rate-limit keying.
///
/// Order of trust: X-Forwarded-For (first hop), X-Real-IP, then the direct
/// socket address. Returns "unknown" only when none is available.
pub fn extract_client_ip(headers: &axum::http::HeaderMap, direct_ip: Option<IpAddr>) -> String {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded_for.to_str() {
            // X-Forwarded-For can contain multiple IPs: "client, proxy1, proxy2"
            let first_ip = forwarded_str.split(',').next().unwrap_or("").trim();
            if let Ok(ip) = first_ip.parse::<IpAddr>() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            if let Ok(ip) = real_ip_str.trim().parse::<IpAddr>() {
                return ip.to_string();
            }
        }
    }

    if let Some(ip) = direct_ip {
        return ip.to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(extract_client_ip(&headers, None), "203.0.113.7");
    }

    #[test]
    fn real_ip_used_when_forwarded_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(extract_client_ip(&headers, None), "198.51.100.2");
    }

    #[test]
    fn falls_back_to_direct_ip() {
        let headers = HeaderMap::new();
        let direct = Some("192.0.2.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, direct), "192.0.2.1");
    }

    #[test]
    fn garbage_forwarded_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let direct = Some("192.0.2.1".parse().unwrap());
        assert_eq!(extract_client_ip(&headers, direct), "192.0.2.1");
    }
}
