//! Co-processor RPC client.
//!
//! One request in flight at a time.  The caller's thread drives the
//! transport: write the frame, then poll `read` until the response with the
//! matching sequence number arrives.  Every read counts against the poll
//! budget (`rpc_timeout_ms / READ_YIELD_MS` reads), whether it returns
//! nothing, noise, or a stale frame, so a call always ends.
//!
//! Bytes read past the end of a response stay in the client and are fed to
//! the decoder before the next read.

use core::net::Ipv4Addr;

use heapless::String;
use log::{debug, warn};

use super::codec::{FrameDecoder, MAX_ENCODED_SIZE, MAX_FRAME_SIZE, encode_frame};
use super::messages::{self, Request, Response};
use crate::app::ports::{CoProcessorPort, NetworkIdentity, RpcError};
use crate::config::READ_YIELD_MS;
use crate::transport::Transport;

/// Bytes pulled from the transport per `read` call.
const READ_CHUNK: usize = 32;

pub struct RpcClient<T: Transport> {
    transport: T,
    decoder: FrameDecoder,
    /// Last chunk read; `rx_buf[rx_pos..rx_len]` is not yet decoded.
    rx_buf: [u8; READ_CHUNK],
    rx_pos: usize,
    rx_len: usize,
    seq: u8,
    poll_budget: u32,
    debug: bool,
}

impl<T: Transport> RpcClient<T> {
    pub fn new(transport: T, rpc_timeout_ms: u32, debug: bool) -> Self {
        Self {
            transport,
            decoder: FrameDecoder::new(),
            rx_buf: [0; READ_CHUNK],
            rx_pos: 0,
            rx_len: 0,
            seq: 0,
            poll_budget: (rpc_timeout_ms / READ_YIELD_MS).max(1),
            debug,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and wait for its response.
    pub fn call(&mut self, request: &Request) -> Result<Response, RpcError> {
        self.seq = self.seq.wrapping_add(1);
        let seq = self.seq;

        let mut payload = [0u8; MAX_FRAME_SIZE];
        let used = messages::encode(request, &mut payload)
            .map_err(|_| RpcError::Encode)?
            .len();
        let mut frame = [0u8; MAX_ENCODED_SIZE];
        let n = encode_frame(seq, &payload[..used], &mut frame).ok_or(RpcError::Encode)?;

        if self.debug {
            debug!("RPC -> {} seq={} ({} bytes)", request.name(), seq, n);
        }
        write_all(&mut self.transport, &frame[..n])?;
        self.transport.flush().map_err(|_| RpcError::Transport)?;

        self.await_response(seq)
    }

    fn await_response(&mut self, seq: u8) -> Result<Response, RpcError> {
        let mut polls = 0u32;

        loop {
            while self.rx_pos < self.rx_len {
                let byte = self.rx_buf[self.rx_pos];
                self.rx_pos += 1;
                let Some(frame) = self.decoder.push(byte) else {
                    continue;
                };
                if frame.seq != seq {
                    warn!("RPC: dropping stale frame seq={} (want {})", frame.seq, seq);
                    continue;
                }
                let response: Response =
                    messages::decode(frame.payload).map_err(|_| RpcError::Decode)?;
                if self.debug {
                    debug!("RPC <- {:?} seq={}", response, seq);
                }
                return Ok(response);
            }

            if polls == self.poll_budget {
                break;
            }
            polls += 1;
            // Nothing stale survives a failed read.
            self.rx_pos = 0;
            self.rx_len = 0;
            self.rx_len = self
                .transport
                .read(&mut self.rx_buf)
                .map_err(|_| RpcError::Transport)?;
        }

        warn!("RPC: no response to seq={} after {} reads", seq, self.poll_budget);
        self.decoder.reset();
        Err(RpcError::Timeout)
    }

    fn expect_ok(&mut self, request: &Request) -> Result<(), RpcError> {
        match self.call(request)? {
            Response::Status(0) => Ok(()),
            Response::Status(code) => Err(RpcError::Remote(code)),
            Response::Lease { .. } => Err(RpcError::UnexpectedResponse),
        }
    }
}

fn write_all<T: Transport>(transport: &mut T, mut data: &[u8]) -> Result<(), RpcError> {
    while !data.is_empty() {
        let n = transport.write(data).map_err(|_| RpcError::Transport)?;
        if n == 0 {
            return Err(RpcError::Transport);
        }
        data = &data[n..];
    }
    Ok(())
}

impl<T: Transport> CoProcessorPort for RpcClient<T> {
    fn init(&mut self) -> Result<(), RpcError> {
        self.expect_ok(&Request::Init)
    }

    fn associate(&mut self, ssid: &str, password: &str) -> Result<(), RpcError> {
        let request = Request::Associate {
            ssid: String::try_from(ssid).map_err(|()| RpcError::Encode)?,
            password: String::try_from(password).map_err(|()| RpcError::Encode)?,
        };
        self.expect_ok(&request)
    }

    fn leased_address(&mut self) -> Result<NetworkIdentity, RpcError> {
        match self.call(&Request::GetLeasedAddress)? {
            Response::Lease { ip, mask, gateway } => Ok(NetworkIdentity {
                ip: Ipv4Addr::from(ip),
                mask: Ipv4Addr::from(mask),
                gateway: Ipv4Addr::from(gateway),
            }),
            Response::Status(0) => Err(RpcError::UnexpectedResponse),
            Response::Status(code) => Err(RpcError::Remote(code)),
        }
    }
}
