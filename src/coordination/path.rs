//! Node layout: `{root}/instances/{appName}/{host}:{port}`.

pub const INSTANCES: &str = "instances";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePath {
    pub app_name: String,
    pub host: String,
    pub port: u16,
}

fn normalize_root(root: &str) -> &str {
    root.trim_end_matches('/')
}

pub fn instances_root(root: &str) -> String {
    format!("{}/{}", normalize_root(root), INSTANCES)
}

pub fn app_path(root: &str, app_name: &str) -> String {
    format!("{}/{}", instances_root(root), app_name)
}

pub fn instance_path(root: &str, app_name: &str, host: &str, port: u16) -> String {
    format!("{}/{}:{}", app_path(root, app_name), host, port)
}

/// Recovers `(app, host, port)` from an instance node path. Paths of any other
/// depth or shape under `root` yield `None`.
pub fn parse_instance_path(root: &str, path: &str) -> Option<InstancePath> {
    let relative = path.strip_prefix(normalize_root(root))?.strip_prefix('/')?;

    let segments: Vec<&str> = relative.split('/').collect();
    let [instances, app_name, leaf] = segments.as_slice() else {
        return None;
    };

    if *instances != INSTANCES || app_name.is_empty() {
        return None;
    }

    let (host, port) = leaf.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok()?;

    Some(InstancePath {
        app_name: app_name.to_string(),
        host: host.to_string(),
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_build_paths() {
        assert_eq!(instances_root("/apps"), "/apps/instances");
        assert_eq!(instances_root("/apps/"), "/apps/instances");
        assert_eq!(app_path("/apps", "orderApp"), "/apps/instances/orderApp");
        assert_eq!(
            instance_path("/apps", "orderApp", "10.0.0.1", 8080),
            "/apps/instances/orderApp/10.0.0.1:8080"
        );
        assert_eq!(
            instance_path("", "orderApp", "10.0.0.1", 8080),
            "/instances/orderApp/10.0.0.1:8080"
        );
    }

    #[test]
    fn test_parse_instance_path() {
        let parsed = parse_instance_path("/apps", "/apps/instances/orderApp/10.0.0.1:8080");
        assert_eq!(
            parsed,
            Some(InstancePath {
                app_name: "orderApp".to_string(),
                host: "10.0.0.1".to_string(),
                port: 8080,
            })
        );

        let parsed = parse_instance_path("", "/instances/orderApp/10.0.0.1:8080").unwrap();
        assert_eq!(parsed.app_name, "orderApp");
    }

    #[test]
    fn test_parse_rejects_unexpected_shapes() {
        let root = "/apps";
        assert_eq!(parse_instance_path(root, "/apps/instances/orderApp"), None);
        assert_eq!(parse_instance_path(root, "/apps/instances"), None);
        assert_eq!(parse_instance_path(root, "/apps"), None);
        assert_eq!(
            parse_instance_path(root, "/apps/instances/orderApp/10.0.0.1:8080/extra"),
            None
        );
        assert_eq!(
            parse_instance_path(root, "/apps/other/orderApp/10.0.0.1:8080"),
            None
        );
        assert_eq!(
            parse_instance_path(root, "/elsewhere/instances/orderApp/10.0.0.1:8080"),
            None
        );
        assert_eq!(
            parse_instance_path(root, "/apps/instances/orderApp/10.0.0.1"),
            None
        );
        assert_eq!(
            parse_instance_path(root, "/apps/instances/orderApp/10.0.0.1:http"),
            None
        );
        assert_eq!(parse_instance_path(root, "/apps/instances//10.0.0.1:80"), None);
    }
}
