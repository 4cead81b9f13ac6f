//! Background ticker for a shared [`Carousel`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::Carousel;
use crate::events::CarouselEvent;

/// Ticks a carousel at a fixed cadence and forwards the events it produces.
///
/// The task is aborted on [`shutdown`](Self::shutdown) or drop.
pub struct CarouselDriver {
    handle: Option<JoinHandle<()>>,
}

impl CarouselDriver {
    pub fn spawn(
        carousel: Arc<Mutex<Carousel>>,
        every: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<CarouselEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut carousel = carousel.lock().await;
                if carousel.is_torn_down() {
                    debug!("carousel torn down, driver exiting");
                    break;
                }
                if let Some(event) = carousel.tick() {
                    // Nobody listening is fine; the carousel keeps rotating.
                    let _ = tx.send(event);
                }
            }
        });
        (
            Self {
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking and wait for the task to wind down.
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for CarouselDriver {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::clock::ManualClock;
    use crate::context::MealBucket;
    use crate::rotation::RotationConfig;
    use crate::selector::{PromoManager, SelectionConfig};
    use crate::storage::MemoryKvStore;

    async fn shared(clock: Arc<ManualClock>) -> Arc<Mutex<Carousel>> {
        let manager = Arc::new(PromoManager::new(
            Catalog::builtin(),
            Arc::new(MemoryKvStore::new()),
            clock.clone(),
            SelectionConfig::default(),
        ));
        let mut carousel = Carousel::new(manager, clock, RotationConfig::default(), MealBucket::Lunch);
        carousel.load().await;
        Arc::new(Mutex::new(carousel))
    }

    #[tokio::test(start_paused = true)]
    async fn driver_forwards_advances() {
        let clock = Arc::new(ManualClock::at("2024-06-05T12:00:00+00:00").unwrap());
        let carousel = shared(clock.clone()).await;
        let (driver, mut events) = CarouselDriver::spawn(carousel.clone(), Duration::from_millis(100));
        assert!(driver.is_running());

        clock.advance_ms(5_000);
        let event = events.recv().await.unwrap();
        assert!(matches!(event, CarouselEvent::Advanced { from: 0, to: 1, .. }));
        driver.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_ticking() {
        let clock = Arc::new(ManualClock::at("2024-06-05T12:00:00+00:00").unwrap());
        let carousel = shared(clock.clone()).await;
        let (driver, _events) = CarouselDriver::spawn(carousel.clone(), Duration::from_millis(100));
        driver.shutdown().await;

        clock.advance_ms(60_000);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(carousel.lock().await.current_index(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_exits_after_teardown() {
        let clock = Arc::new(ManualClock::at("2024-06-05T12:00:00+00:00").unwrap());
        let carousel = shared(clock).await;
        let (driver, mut events) = CarouselDriver::spawn(carousel.clone(), Duration::from_millis(100));
        carousel.lock().await.teardown();
        assert!(events.recv().await.is_none());
        driver.shutdown().await;
    }
}
