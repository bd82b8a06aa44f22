use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use imgprov::ProvisionError;
use imgprov::home::{DEFAULT_HOME_DIR, resolve_home_dir};
use imgprov::tls::{TlsRequest, build_tls_transfer_plan, should_skip_tls};

fn request(cert: &str, key: &str, domain: &str) -> TlsRequest {
    TlsRequest {
        cert_source: cert.to_string(),
        key_source: key.to_string(),
        domain: domain.to_string(),
        home_dir: Utf8PathBuf::from("/home/ubuntu"),
        proxy_config: "server {\n    server_name app.example.com;\n}\n".to_string(),
    }
}

#[test]
fn partial_triples_are_configuration_errors() {
    let values = ["", "x"];
    for cert in values {
        for key in values {
            for domain in values {
                let set = [cert, key, domain].iter().filter(|v| !v.is_empty()).count();
                let result = should_skip_tls(cert, key, domain);
                match set {
                    0 => assert!(result.unwrap()),
                    3 => assert!(!result.unwrap()),
                    _ => assert!(
                        matches!(result, Err(ProvisionError::Configuration(_))),
                        "({:?}, {:?}, {:?}) should be rejected",
                        cert,
                        key,
                        domain
                    ),
                }
            }
        }
    }
}

#[test]
fn skipped_request_yields_empty_plan() {
    let plan = build_tls_transfer_plan(&request("", "", "")).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn partial_request_yields_error_and_no_plan() {
    let err = build_tls_transfer_plan(&request("/tls/ssl.crt", "", "")).unwrap_err();
    assert!(matches!(err, ProvisionError::Configuration(_)));
}

#[test]
fn full_request_maps_three_files_under_home() {
    let req = request("/tls/ssl.crt", "/tls/ssl.key", "app.example.com");
    let plan = build_tls_transfer_plan(&req).unwrap();

    assert_eq!(plan.len(), 3);
    assert_eq!(
        plan.destination_of(Utf8Path::new("/tls/ssl.crt")),
        Some(Utf8Path::new("/home/ubuntu/ssl.crt"))
    );
    assert_eq!(
        plan.destination_of(Utf8Path::new("/tls/ssl.key")),
        Some(Utf8Path::new("/home/ubuntu/ssl.key"))
    );

    let staged = &plan.transfers()[2];
    assert_eq!(staged.destination, "/home/ubuntu/nginx-ssl.conf");
    assert_eq!(fs::read_to_string(&staged.source).unwrap(), req.proxy_config);
}

#[test]
fn staged_config_is_removed_with_plan() {
    let req = request("/tls/ssl.crt", "/tls/ssl.key", "app.example.com");
    let plan = build_tls_transfer_plan(&req).unwrap();
    let staged = plan.transfers()[2].source.clone();
    assert!(staged.exists());

    drop(plan);
    assert!(!staged.exists());
}

#[test]
fn home_dir_default_and_override() {
    assert_eq!(resolve_home_dir("").unwrap(), DEFAULT_HOME_DIR);
    assert_eq!(resolve_home_dir("/custom").unwrap(), "/custom");
}
