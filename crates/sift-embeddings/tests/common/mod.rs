//! In-process HTTP mock for the cloud backends.

use axum::Router;

pub struct MockServer {
    pub base_url: String,
    _runtime: tokio::runtime::Runtime,
}

/// Serve `router` on an ephemeral local port. `None` when the sandbox
/// forbids binding sockets.
pub fn spawn(router: Router) -> Option<MockServer> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("mock runtime");
    let listener = match runtime.block_on(tokio::net::TcpListener::bind("127.0.0.1:0")) {
        Ok(listener) => listener,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping: cannot bind local socket: {e}");
            return None;
        }
        Err(e) => panic!("bind mock server: {e}"),
    };
    let addr = listener.local_addr().expect("mock addr");
    runtime.spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Some(MockServer {
        base_url: format!("http://{addr}"),
        _runtime: runtime,
    })
}
