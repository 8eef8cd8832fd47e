//! Marker channels towards the physiological recording software.

use std::{
    io::{self, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs},
};

use bart_core::{SinkError, TriggerCode, TriggerSink};
use tracing::debug;

/// Trigger sink writing markers to a TCP connection.
#[derive(Debug)]
pub(crate) struct TcpTrigger {
    stream: Option<TcpStream>,
}

impl TcpTrigger {
    pub(crate) fn connect(address: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = TcpStream::connect(address)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            stream: Some(stream),
        })
    }
}

impl TriggerSink for TcpTrigger {
    fn send(&mut self, code: TriggerCode) -> Result<(), SinkError> {
        let stream = self.stream.as_mut().ok_or(SinkError::Closed)?;
        stream.write_all(code.payload().as_bytes())?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown(Shutdown::Both) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => Err(error.into()),
            _ => Ok(()),
        }
    }
}

/// Trigger sink that drops every marker, for rehearsals without recording hardware.
#[derive(Debug, Default)]
pub(crate) struct DiscardTrigger {
    closed: bool,
}

impl TriggerSink for DiscardTrigger {
    fn send(&mut self, code: TriggerCode) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        debug!(payload = %code.payload(), "trigger discarded");
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::Read, net::TcpListener, thread};

    #[test]
    fn tcp_trigger_writes_payloads_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let address = listener.local_addr().expect("listener address");
        let reader = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept trigger");
            let mut received = String::new();
            let _ = stream.read_to_string(&mut received).expect("read payloads");
            received
        });

        let mut trigger = TcpTrigger::connect(address).expect("connect trigger");
        trigger.send(TriggerCode::Popped).expect("send pop");
        trigger.send(TriggerCode::CashedIn).expect("send cash-in");
        trigger.close().expect("close trigger");

        let received = reader.join().expect("reader thread");
        assert_eq!(received, "<TRIGGER>9</TRIGGER><TRIGGER>7</TRIGGER>");
        assert!(matches!(
            trigger.send(TriggerCode::Popped),
            Err(SinkError::Closed)
        ));
    }

    #[test]
    fn discard_trigger_refuses_markers_after_close() {
        let mut trigger = DiscardTrigger::default();

        assert!(trigger.send(TriggerCode::CashedIn).is_ok());
        trigger.close().expect("close discard sink");
        assert!(matches!(
            trigger.send(TriggerCode::CashedIn),
            Err(SinkError::Closed)
        ));
    }
}
