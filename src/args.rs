use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// Serves a set of LED lights over the lightnode udp protocols.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct NodeArgs {
    /// Path to the json node configuration.
    #[clap(short, long)]
    pub config: PathBuf,

    /// Address to bind both sockets to, overriding the configuration.
    #[clap(short, long)]
    pub bind: Option<IpAddr>,

    /// Port of the session (keepalive) protocol.
    #[clap(long)]
    pub session_port: Option<u16>,

    /// Port of the command protocol.
    #[clap(long)]
    pub command_port: Option<u16>,

    /// Log filter used when RUST_LOG is not set.
    #[clap(short, long, default_value = "info")]
    pub log: String,
}

/// An interactive shell for poking at a running node.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct ShellArgs {
    /// Address of the node.
    #[clap(short, long, default_value = "127.0.0.1")]
    pub node: IpAddr,

    /// Session port of the node.
    #[clap(long, default_value = "54923")]
    pub session_port: u16,

    /// Command port of the node.
    #[clap(long, default_value = "5492")]
    pub command_port: u16,

    /// Local port that receives session replies.
    #[clap(long, default_value = "54924")]
    pub reply_port: u16,
}
