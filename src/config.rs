use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Cloud Ready API: static item list with health and Prometheus metrics.
#[derive(Parser, Debug, Clone)]
#[command(name = "cloud-ready-api", version, about)]
pub struct Args {
    /// Interface to bind.
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    pub port: u16,
}

impl Args {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
