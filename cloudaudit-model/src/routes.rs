macro_rules! api_path {
    ($path:literal) => {
        concat!("/api", $path)
    };
}

/// Route definitions shared by the server and its clients.
pub mod api {
    pub const ROOT: &str = "/api";
    pub const HEALTH: &str = "/health";

    pub mod audits {
        pub const RUN: &str = api_path!("/audits/run");
        pub const STATUS: &str = api_path!("/audits/status");
        pub const CATEGORIES: &str = api_path!("/audits/categories");
        pub const ITEM: &str = api_path!("/audits/{id}");
        pub const REPORT: &str = api_path!("/audits/{id}/report");
    }

    pub mod admin {
        pub const AUDIT_INVENTORY: &str = api_path!("/admin/audit-inventory");
    }

    pub mod credentials {
        pub const ITEM: &str = api_path!("/credentials/{project}");
    }

    pub mod headers {
        /// Scopes cached credentials; absent means the anonymous session.
        pub const SESSION: &str = "x-session-id";
    }
}

/// Helper utilities for working with route templates
pub mod utils {
    /// Replace a single path parameter (e.g. `"{id}"`) with the provided value.
    pub fn replace_param(
        route: &str,
        param: &str,
        value: impl AsRef<str>,
    ) -> String {
        route.replace(param, value.as_ref())
    }

    /// Append query parameters to the provided route.
    pub fn with_query(route: &str, params: &[(&str, &str)]) -> String {
        if params.is_empty() {
            return route.to_string();
        }

        let mut path =
            String::with_capacity(route.len() + 1 + params.len() * 8);
        path.push_str(route);
        path.push('?');

        for (i, (key, value)) in params.iter().enumerate() {
            if i > 0 {
                path.push('&');
            }
            path.push_str(key);
            path.push('=');
            path.push_str(value);
        }

        path
    }
}

#[cfg(test)]
mod tests {
    use super::{api, utils};

    #[test]
    fn builds_status_and_report_paths() {
        assert_eq!(
            utils::with_query(api::audits::STATUS, &[("id", "abc")]),
            "/api/audits/status?id=abc"
        );
        assert_eq!(
            utils::replace_param(api::audits::REPORT, "{id}", "abc"),
            "/api/audits/abc/report"
        );
    }
}
