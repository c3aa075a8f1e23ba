// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use arc_swap::ArcSwapOption;
use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;

use crate::Error;
use crate::record::Record;

/// Create a bounded multi-producer single-consumer record queue.
pub(crate) fn queue(capacity: usize) -> (Producer, Consumer) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity);
    let pending = Arc::new(AtomicUsize::new(0));

    let producer = Producer {
        sender: ArcSwapOption::from(Some(Arc::new(sender))),
        pending: pending.clone(),
    };
    let consumer = Consumer { receiver, pending };
    (producer, consumer)
}

/// The input side of the queue.
///
/// Once closed, no record is accepted anymore. Records already queued stay there until the
/// consumer drains them.
#[derive(Debug)]
pub(crate) struct Producer {
    sender: ArcSwapOption<Sender<Record>>,
    pending: Arc<AtomicUsize>,
}

impl Producer {
    /// Enqueue a record, blocking while the queue is full.
    pub(crate) fn push(&self, record: Record) -> Result<(), Error> {
        // Hold our own reference while blocked so a concurrent close cannot drop the record.
        let Some(sender) = self.sender.load_full() else {
            return Err(Error::new("log manager is stopped"));
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        sender.send(record).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            Error::new("failed to send record: log worker has exited")
        })
    }

    /// Stop accepting records. Returns `false` if already closed.
    pub(crate) fn close(&self) -> bool {
        self.sender.swap(None).is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.load().is_none()
    }

    /// Records pushed but not yet marked done by the consumer.
    pub(crate) fn backlog(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// The output side of the queue, owned by the single worker.
#[derive(Debug)]
pub(crate) struct Consumer {
    receiver: Receiver<Record>,
    pending: Arc<AtomicUsize>,
}

impl Consumer {
    /// Dequeue the next record, blocking while the queue is empty.
    ///
    /// Returns `None` once the producer is closed and every queued record has been dequeued.
    pub(crate) fn pop(&self) -> Option<Record> {
        self.receiver.recv().ok()
    }

    /// Dequeue the next record if one is immediately available.
    pub(crate) fn try_pop(&self) -> Option<Record> {
        self.receiver.try_recv().ok()
    }

    /// Mark one dequeued record as fully processed.
    pub(crate) fn done(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}
