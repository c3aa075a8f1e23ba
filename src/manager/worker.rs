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

use crate::layout::TextLayout;
use crate::manager::queue::Consumer;
use crate::rolling::RollingFile;

/// The single background task of a log manager.
///
/// Dequeues records in FIFO order, formats them and hands the lines to the rolling file. The
/// file is flushed whenever the queue runs empty.
pub(crate) struct Worker {
    consumer: Consumer,
    layout: TextLayout,
    sink: RollingFile,
}

impl Worker {
    pub(crate) fn new(consumer: Consumer, layout: TextLayout, sink: RollingFile) -> Self {
        Self {
            consumer,
            layout,
            sink,
        }
    }

    pub(crate) fn run(self) {
        let Self {
            consumer,
            layout,
            mut sink,
        } = self;

        sink.start();

        let mut line = String::new();
        while let Some(record) = consumer.pop() {
            layout.format(&record, &mut line);
            sink.write(line.as_bytes());
            consumer.done();

            while let Some(record) = consumer.try_pop() {
                layout.format(&record, &mut line);
                sink.write(line.as_bytes());
                consumer.done();
            }
            sink.flush();
        }

        sink.close();
    }
}
