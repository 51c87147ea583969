pub mod github_http;
