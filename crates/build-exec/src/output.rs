//! Output de los steps convertido en eventos `Log`.
//!
//! `LogSink` acumula bytes y emite un evento por cada porción que termina en
//! un límite de línea (el último `\n`, o el último `\r` si no hay `\n`). Si
//! pasa `flush_interval` desde el último flush sin que aparezca un límite,
//! la siguiente escritura emite todo el buffer. Cada porción se redacta
//! completa antes de guardarse, así un secreto partido entre dos `write` no
//! se filtra.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use build_core::{Build, BuildEventKind, LogStream, PlanId, Redactor};
use chrono::{DateTime, Utc};
use log::trace;

use crate::clock::Clock;

pub struct LogSink {
    build: Arc<dyn Build>,
    origin: PlanId,
    stream: LogStream,
    clock: Arc<dyn Clock>,
    redactor: Option<Redactor>,
    flush_interval: Duration,
    buffer: Vec<u8>,
    last_flush: DateTime<Utc>,
}

impl LogSink {
    pub fn new(build: Arc<dyn Build>,
               origin: PlanId,
               stream: LogStream,
               clock: Arc<dyn Clock>,
               redactor: Option<Redactor>,
               flush_interval: Duration)
               -> Self {
        let last_flush = clock.now();
        Self { build,
               origin,
               stream,
               clock,
               redactor,
               flush_interval,
               buffer: Vec::new(),
               last_flush }
    }

    pub fn stream(&self) -> LogStream {
        self.stream
    }

    /// Bytes aún no emitidos.
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Emite lo que quede en el buffer. Sin buffer no hace nada.
    pub fn close(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        self.emit(&self.buffer)?;
        self.buffer.clear();
        self.last_flush = self.clock.now();
        Ok(())
    }

    /// Un reloj que retrocede cuenta como ventana vacía.
    fn window_elapsed(&self) -> bool {
        let elapsed = (self.clock.now() - self.last_flush).to_std().unwrap_or(Duration::ZERO);
        elapsed >= self.flush_interval
    }

    fn emit(&self, chunk: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(chunk);
        let payload = match &self.redactor {
            Some(redactor) => redactor.redact(&text),
            None => text.into_owned(),
        };
        trace!("log chunk origin={} stream={:?} bytes={}", self.origin, self.stream, chunk.len());
        self.build
            .save_event(&self.origin, self.clock.now(), BuildEventKind::Log { stream: self.stream, payload })
            .map_err(io::Error::other)
    }
}

impl Write for LogSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let previous_len = self.buffer.len();
        self.buffer.extend_from_slice(data);

        let cut = match line_boundary(&self.buffer) {
            Some(idx) => idx + 1,
            None if self.window_elapsed() => utf8_prefix_len(&self.buffer),
            None => return Ok(data.len()),
        };
        if cut == 0 {
            return Ok(data.len());
        }

        if let Err(err) = self.emit(&self.buffer[..cut]) {
            // el caller puede reintentar con los mismos bytes
            self.buffer.truncate(previous_len);
            return Err(err);
        }
        self.buffer.drain(..cut);
        self.last_flush = self.clock.now();
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.close()
    }
}

fn line_boundary(buf: &[u8]) -> Option<usize> {
    buf.iter().rposition(|&b| b == b'\n').or_else(|| buf.iter().rposition(|&b| b == b'\r'))
}

/// Largo del prefijo que no corta un carácter UTF-8 a la mitad.
fn utf8_prefix_len(buf: &[u8]) -> usize {
    match std::str::from_utf8(buf) {
        Ok(_) => buf.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => buf.len(),
    }
}

/// `LogSink` compartido. Todos los clones escriben al mismo buffer.
#[derive(Clone)]
pub struct SharedSink(Arc<Mutex<LogSink>>);

impl SharedSink {
    pub fn new(sink: LogSink) -> Self {
        Self(Arc::new(Mutex::new(sink)))
    }

    pub fn close(&self) -> io::Result<()> {
        self.lock().close()
    }

    pub fn pending(&self) -> Vec<u8> {
        self.lock().pending().to_vec()
    }

    fn lock(&self) -> MutexGuard<'_, LogSink> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SharedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl Write for &SharedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.lock().write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flush()
    }
}

impl std::fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = self.lock();
        f.debug_struct("SharedSink")
         .field("origin", &sink.origin)
         .field("stream", &sink.stream)
         .field("pending", &sink.buffer.len())
         .finish()
    }
}
