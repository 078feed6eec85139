//! Steam Web API gateway.

mod client;
mod id;
pub mod types;

pub use client::{SteamClient, SteamError, SUMMARY_BATCH};
pub use id::parse_steam_id;
pub use types::{achievement_progress, rarest_unlocked};

#[cfg(test)]
pub(crate) mod stub_server {
    use std::{
        io::{Read, Write},
        net::TcpListener,
        thread,
    };

    /// Answer the next `count` requests on a local port with `status_line`
    /// and an empty JSON body. Returns the base URL to point a client at.
    pub(crate) fn respond_with(status_line: &'static str, count: usize) -> std::io::Result<String> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        thread::spawn(move || {
            for stream in listener.incoming().take(count) {
                let Ok(mut stream) = stream else { break };
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "{status_line}\r\nContent-Type: application/json\r\n\
                     Content-Length: 2\r\nConnection: close\r\n\r\n{{}}"
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        Ok(format!("http://{addr}"))
    }
}
