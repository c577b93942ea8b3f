use anyhow::Result;
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::commands;
use super::config::Timing;
use super::error::SessionError;
use super::input_loop::input_tick;
use super::render_loop::{self, ConversionJob};
use super::session::Session;
use crate::convert::{Converter, Reduction};
use crate::host::{ConsoleHost, Host, HostEvent, KeyValueStore};
use crate::placement::OWNERS;
use crate::sync::Ticker;
use crate::utils::logger;

/// Upper bound on one idle wait, so shutdown and host input are noticed promptly.
const IDLE_WAIT: Duration = Duration::from_millis(10);

type ConversionResult = (ConversionJob, Result<Reduction, SessionError>);

struct InFlight {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Cooperative main loop: render, input and autosave ticks plus host events, all on one thread.
///
/// Only the converter runs elsewhere. While it works, render ticks are coalesced and the next
/// one is scheduled a full interval after its result comes back.
pub struct Scheduler<W: Write, S: KeyValueStore> {
    session: Session,
    host: ConsoleHost<W>,
    store: S,
    converter: Arc<dyn Converter>,
    timing: Timing,
    running: Arc<AtomicBool>,
}

impl<W: Write, S: KeyValueStore> Scheduler<W, S> {
    pub fn new(
        session: Session,
        host: ConsoleHost<W>,
        store: S,
        converter: Arc<dyn Converter>,
        timing: Timing,
    ) -> Self {
        Self {
            session,
            host,
            store,
            converter,
            timing,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Clearing this flag stops [`run`](Self::run) at its next wakeup.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until the running flag drops or the host event stream ends.
    pub fn run(&mut self, events: Receiver<HostEvent>) -> Result<()> {
        for owner in OWNERS.iter() {
            self.host.clear_owner(owner, true)?;
        }
        logger::info(&format!(
            "Physical gamepad has {} buttons",
            self.session.buttons().len()
        ));

        let (result_tx, result_rx) = crossbeam_channel::unbounded::<ConversionResult>();
        let start = Instant::now();
        let mut render = Ticker::new(self.timing.render_interval(self.session.slow), start);
        let mut input = Ticker::new(self.timing.input_interval(), start);
        let mut autosave = Ticker::new(self.timing.autosave_interval(), start);
        let mut in_flight: Option<InFlight> = None;
        let mut last = start;

        'outer: while self.running.load(Ordering::SeqCst) {
            loop {
                match events.try_recv() {
                    Ok(event) => self.handle_event(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        logger::info("Host input closed");
                        break 'outer;
                    }
                }
            }

            let now = Instant::now();
            self.session.advance(now - last);
            last = now;

            if let Ok((job, result)) = result_rx.try_recv() {
                if let Some(job_thread) = in_flight.take() {
                    let _ = job_thread.handle.join();
                }
                if !self.running.load(Ordering::SeqCst) {
                    logger::info("Dropping conversion result after shutdown");
                    break;
                }
                if let Err(e) = render_loop::finish(&mut self.session, &mut self.host, &job, result) {
                    logger::error(&format!("frame err: {:#}", e));
                }
                render.set_interval(self.timing.render_interval(self.session.slow));
                render.resume_after(Instant::now());
            }

            if render.is_due(now) && in_flight.is_none() {
                match render_loop::prepare(&mut self.session) {
                    Ok(Some(job)) => {
                        in_flight = Some(self.spawn_conversion(job, result_tx.clone()));
                        render.suspend();
                    }
                    Ok(None) => render.fire(now),
                    Err(e) => {
                        logger::error(&format!("frame err: {:#}", e));
                        render.fire(now);
                    }
                }
                render.set_interval(self.timing.render_interval(self.session.slow));
            }

            if input.is_due(now) {
                if let Err(e) = input_tick(&mut self.session, &mut self.host) {
                    logger::error(&format!("{:#}", e));
                }
                input.fire(now);
            }

            if autosave.is_due(now) {
                match self.session.autosave() {
                    Ok(Some(path)) => logger::debug(&format!("Autosaved to {}", path.display())),
                    Ok(None) => {}
                    Err(e) => logger::error(&format!("Autosave failed: {:#}", e)),
                }
                autosave.fire(now);
            }

            let wait = [render.time_until(now), input.time_until(now), autosave.time_until(now)]
                .into_iter()
                .flatten()
                .min()
                .unwrap_or(IDLE_WAIT)
                .min(IDLE_WAIT);
            thread::sleep(wait);
        }

        if let Some(job_thread) = in_flight.take() {
            logger::info("Cancelling in-flight conversion");
            job_thread.cancel.store(true, Ordering::SeqCst);
            let _ = job_thread.handle.join();
        }
        // late results are dropped unplaced
        drop(result_rx);
        self.session.release_keys();
        logger::info("Scheduler stopped");
        Ok(())
    }

    fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Chat { player, message } => {
                if let Err(e) = commands::handle_chat(
                    &mut self.session,
                    &mut self.host,
                    &mut self.store,
                    &player,
                    &message,
                ) {
                    logger::error(&format!("Chat from {} failed: {:#}", player, e));
                }
            }
            other => self.host.apply_event(&other),
        }
    }

    fn spawn_conversion(&self, job: ConversionJob, results: Sender<ConversionResult>) -> InFlight {
        let cancel = Arc::new(AtomicBool::new(false));
        let converter = Arc::clone(&self.converter);
        let flag = Arc::clone(&cancel);
        let handle = thread::spawn(move || {
            let result = converter.convert(&job.request, &flag);
            let _ = results.send((job, result));
        });
        InFlight { cancel, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::heightmap::validate_output;
    use crate::convert::ConversionRequest;
    use crate::core::session::tests::{session_with_rom, MemoryStore};
    use std::sync::Mutex;

    struct CountingConverter {
        calls: Mutex<usize>,
        block_until_cancelled: bool,
        /// Cleared while converting, like Ctrl-C arriving mid-frame
        stop_on_convert: Option<Arc<AtomicBool>>,
    }

    impl CountingConverter {
        fn new(block_until_cancelled: bool) -> Self {
            Self { calls: Mutex::new(0), block_until_cancelled, stop_on_convert: None }
        }
    }

    impl Converter for CountingConverter {
        fn convert(&self, _request: &ConversionRequest, cancel: &AtomicBool) -> Result<Reduction, SessionError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(running) = &self.stop_on_convert {
                running.store(false, Ordering::SeqCst);
            }
            if self.block_until_cancelled {
                while !cancel.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(5));
                }
                return Err(SessionError::ConversionFailed("cancelled".to_string()));
            }
            validate_output(true, "Reduced 100 to 10\nDone!\n")
        }
    }

    fn fast_timing() -> Timing {
        Timing { frame_ms: 30, slow_frame_ms: 60, input_ms: 30, autosave_secs: 3600 }
    }

    fn chat(message: &str) -> HostEvent {
        HostEvent::Chat { player: "host".to_string(), message: message.to_string() }
    }

    #[test]
    fn test_places_first_frame_once() {
        let session = session_with_rom("scheduler_run", &[[40, 50, 60]]);
        let converter = Arc::new(CountingConverter::new(false));
        let mut scheduler = Scheduler::new(
            session,
            ConsoleHost::new(Vec::new()),
            MemoryStore::default(),
            converter.clone(),
            fast_timing(),
        );

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(chat("!gba tetris")).unwrap();
        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_millis(400));
            drop(tx);
        });

        scheduler.run(rx).unwrap();
        feeder.join().unwrap();

        // a single solid frame only ever changes once
        assert_eq!(*converter.calls.lock().unwrap(), 1);
        assert_eq!(scheduler.session.placement().total_frames(), 1);

        let out = String::from_utf8(scheduler.host.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], format!("Bricks.Clear {} 1", OWNERS[0].id));
        assert_eq!(lines[1], format!("Bricks.Clear {} 1", OWNERS[1].id));
        assert!(lines[2].ends_with("Created emulator\""));
        assert_eq!(lines[3], "Bricks.Load \"gba_temp_0.brs\" 0 0 0 1");
        assert_eq!(lines[4], format!("Bricks.Clear {} 1", OWNERS[1].id));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_shutdown_cancels_and_discards() {
        let session = session_with_rom("scheduler_shutdown", &[[40, 50, 60]]);
        let converter = Arc::new(CountingConverter::new(true));
        let mut scheduler = Scheduler::new(
            session,
            ConsoleHost::new(Vec::new()),
            MemoryStore::default(),
            converter.clone(),
            fast_timing(),
        );

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(chat("!gba tetris")).unwrap();
        let running = scheduler.running_flag();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            running.store(false, Ordering::SeqCst);
            drop(tx);
        });

        scheduler.run(rx).unwrap();
        stopper.join().unwrap();

        assert_eq!(*converter.calls.lock().unwrap(), 1);
        assert_eq!(scheduler.session.placement().total_frames(), 0);
        let out = String::from_utf8(scheduler.host.into_inner()).unwrap();
        assert!(!out.contains("Bricks.Load"));
    }

    #[test]
    fn test_result_after_stop_is_not_placed() {
        let session = session_with_rom("scheduler_late", &[[40, 50, 60]]);
        let mut scheduler = Scheduler::new(
            session,
            ConsoleHost::new(Vec::new()),
            MemoryStore::default(),
            Arc::new(CountingConverter::new(false)),
            fast_timing(),
        );
        let mut converter = CountingConverter::new(false);
        converter.stop_on_convert = Some(scheduler.running_flag());
        scheduler.converter = Arc::new(converter);

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(chat("!gba tetris")).unwrap();
        let feeder = thread::spawn(move || {
            thread::sleep(Duration::from_secs(2));
            drop(tx);
        });

        let started = Instant::now();
        scheduler.run(rx).unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));

        assert_eq!(scheduler.session.placement().total_frames(), 0);
        let out = String::from_utf8(scheduler.host.into_inner()).unwrap();
        assert!(!out.contains("Bricks.Load"));
        feeder.join().unwrap();
    }
}
