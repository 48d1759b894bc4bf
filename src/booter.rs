use anyhow::Error;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;

pub struct Booter {
    pub addr: SocketAddr,
    tcp_listener: TcpListener,
}

impl Booter {
    pub async fn new(port: u16) -> Result<Self, Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let tcp_listener = TcpListener::bind(addr).await?;

        Ok(Self {
            addr: tcp_listener.local_addr()?,
            tcp_listener,
        })
    }

    pub async fn start(self, router: Router) -> Result<(), Error> {
        tracing::info!("Listening on http://{}", self.addr);
        axum::serve(
            self.tcp_listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
        Ok(())
    }
}
