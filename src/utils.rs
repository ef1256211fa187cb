use once_cell::sync::Lazy;
use tokio::task::JoinHandle;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn spawn_async<F>(fut: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    RUNTIME.spawn(fut)
}

/// Drives a future to completion from synchronous code. Must not be called from inside the runtime.
pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    RUNTIME.block_on(fut)
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("127.0.0.1:5000", "http://127.0.0.1:5000")]
    #[case("  https://contacts.example.com/ ", "https://contacts.example.com")]
    #[case("http://localhost:5000/api/", "http://localhost:5000/api")]
    #[case("   ", "")]
    fn normalizes_base_urls(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_url(input), expected);
    }

    #[test]
    fn spawned_work_can_be_awaited() {
        let handle = spawn_async(async {});
        assert!(block_on(handle).is_ok());
    }
}
