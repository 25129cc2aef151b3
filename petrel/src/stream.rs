// Copyright (c) 2022 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Affero General Public License that can be found
// in the LICENSE file.

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::Error;

/// Duplex socket connection to one client.
#[derive(Debug)]
pub struct Stream {
    socket: TcpStream,
}

impl Stream {
    #[must_use]
    pub const fn new(socket: TcpStream) -> Self {
        Self { socket }
    }

    /// Read exactly one byte.
    ///
    /// # Errors
    ///
    /// Returns error if the peer closed the connection or the socket failed.
    pub async fn read_byte(&mut self) -> Result<u8, Error> {
        Ok(self.socket.read_u8().await?)
    }

    /// Fill `buf` completely.
    ///
    /// # Errors
    ///
    /// Returns error if the stream ends before `buf` is full.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let _count = self.socket.read_exact(buf).await?;
        Ok(())
    }

    /// Write the whole buffer.
    ///
    /// # Errors
    ///
    /// Returns error if the socket fails.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        self.socket.write_all(buf).await?;
        Ok(())
    }

    /// Flush pending bytes and shut the connection down.
    ///
    /// # Errors
    ///
    /// Returns error if the socket fails.
    pub async fn shutdown(&mut self) -> Result<(), Error> {
        self.socket.shutdown().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the socket is no longer connected.
    pub fn peer_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.peer_addr()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_read_write_over_loopback() {
        tokio_test::block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let client = tokio::spawn(async move {
                let mut socket = TcpStream::connect(addr).await.unwrap();
                socket.write_all(&[0x10, 0x02, 0xab, 0xcd]).await.unwrap();
                let mut reply = [0_u8; 2];
                let _count = socket.read_exact(&mut reply).await.unwrap();
                reply
            });

            let (socket, _peer) = listener.accept().await.unwrap();
            let mut stream = Stream::new(socket);
            assert_eq!(stream.read_byte().await.unwrap(), 0x10);
            let mut body = [0_u8; 3];
            stream.read_exact(&mut body).await.unwrap();
            assert_eq!(body, [0x02, 0xab, 0xcd]);
            stream.write_all(&[0x20, 0x00]).await.unwrap();
            stream.shutdown().await.unwrap();

            assert_eq!(client.await.unwrap(), [0x20, 0x00]);
        });
    }
}
