#![allow(dead_code)]

use http::Method;
use radix_dispatch::Request;

pub fn request(method: Method, path: &str) -> Request {
    http::Request::builder()
        .method(method)
        .uri(path)
        .body(Vec::new())
        .unwrap()
}

pub fn get(path: &str) -> Request {
    request(Method::GET, path)
}

pub fn body_json(res: &http::Response<Vec<u8>>) -> serde_json::Value {
    serde_json::from_slice(res.body()).unwrap()
}

pub fn body_text(res: &http::Response<Vec<u8>>) -> String {
    String::from_utf8(res.body().clone()).unwrap()
}

pub mod temp_files {
    use std::io::Write;

    /// Write `content` to a temporary `.yaml` file that lives as long as the handle
    pub fn create_temp_yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("radix_test_")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}
