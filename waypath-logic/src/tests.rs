use tokio::{
    sync::{Mutex, mpsc},
    task::yield_now,
};

use crate::{
    StateUpdateSender,
    location::{Degrees, PositionFix, SensorSource, SensorUpdate},
};

type UpdateRx<T> = mpsc::Receiver<SensorUpdate<T>>;
type UpdateTx<T> = mpsc::Sender<SensorUpdate<T>>;

/// A sensor source backed by a plain channel, tests push whatever readings
/// they want through it
pub struct MockSensor<T> {
    tx: UpdateTx<T>,
    rx: Mutex<UpdateRx<T>>,
}

pub type MockPositionSource = MockSensor<PositionFix>;
pub type MockHeadingSource = MockSensor<Degrees>;

impl<T> MockSensor<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(20);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub async fn push(&self, update: SensorUpdate<T>) {
        self.tx.send(update).await.expect("Failed to push update");
    }

    pub async fn wait_for_queue_empty(&self) {
        loop {
            let empty = self.tx.is_closed() || self.tx.capacity() == self.tx.max_capacity();

            if empty {
                break;
            } else {
                yield_now().await;
            }
        }
    }
}

impl<T: Send + Sync> SensorSource<T> for MockSensor<T> {
    async fn recv_updates(&self) -> impl Iterator<Item = SensorUpdate<T>> {
        let mut rx = self.rx.lock().await;
        let mut buf = Vec::with_capacity(20);
        rx.recv_many(&mut buf, 20).await;
        buf.into_iter()
    }
}

pub struct DummySender;

impl StateUpdateSender for DummySender {
    fn send_update(&self) {}
}
