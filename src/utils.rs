use once_cell::sync::Lazy;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn spawn_async<F>(fut: F) -> tokio::task::JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle.spawn(fut),
        Err(_) => RUNTIME.spawn(fut),
    }
}

pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    RUNTIME.block_on(fut)
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// `{base}/api/{path}`, tolerating a base that already ends in `/api`.
pub fn join_api(base_url: &str, path: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    let base = if trimmed.ends_with("/api") { trimmed.to_string() } else { format!("{}/api", trimmed) };
    format!("{}/{}", base, path.trim_start_matches('/'))
}
