use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};

use crate::error::Result;
use crate::source::PageSource;

/// Result of one page, tagged with its position in the input
pub struct PageOutcome<T> {
    pub index: usize,
    /// Source name, for diagnostics
    pub name: String,
    pub result: Result<T>,
}

/// Page executor using an MPSC channel to collect per-page results.
///
/// Pages are independent, so they are handed out to worker threads from a
/// shared counter. Results arrive in completion order and are sorted back
/// into input order before they are returned, which keeps the output the
/// same for any number of workers.
pub struct PageExecutor<'a> {
    jobs: usize,
    progress: Option<&'a ProgressBar>,
}

impl<'a> PageExecutor<'a> {
    pub fn new(jobs: usize) -> Self {
        Self {
            jobs: jobs.max(1),
            progress: None,
        }
    }

    /// Tick the given progress bar once per finished page
    pub fn with_progress(mut self, progress: Option<&'a ProgressBar>) -> Self {
        self.progress = progress;
        self
    }

    pub fn execute<T, F>(&self, sources: &[Box<dyn PageSource>], convert: F) -> Vec<PageOutcome<T>>
    where
        T: Send,
        F: Fn(&dyn PageSource) -> Result<T> + Sync,
    {
        if let Some(pb) = self.progress {
            pb.set_length(sources.len() as u64);
        }

        let workers = self.jobs.min(sources.len());
        let mut outcomes = if workers <= 1 {
            self.run_sequential(sources, &convert)
        } else {
            self.run_parallel(sources, &convert, workers)
        };

        outcomes.sort_by_key(|o| o.index);
        outcomes
    }

    fn run_sequential<T, F>(
        &self,
        sources: &[Box<dyn PageSource>],
        convert: &F,
    ) -> Vec<PageOutcome<T>>
    where
        F: Fn(&dyn PageSource) -> Result<T>,
    {
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let outcome = run_one(index, source.as_ref(), convert);
                self.tick(&outcome);
                outcome
            })
            .collect()
    }

    fn run_parallel<T, F>(
        &self,
        sources: &[Box<dyn PageSource>],
        convert: &F,
        workers: usize,
    ) -> Vec<PageOutcome<T>>
    where
        T: Send,
        F: Fn(&dyn PageSource) -> Result<T> + Sync,
    {
        let next = AtomicUsize::new(0);
        let (sender, receiver) = mpsc::channel();

        std::thread::scope(|scope| {
            for worker in 0..workers {
                let sender: Sender<PageOutcome<T>> = sender.clone();
                let next = &next;
                scope.spawn(move || {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(source) = sources.get(index) else {
                            break;
                        };
                        let outcome = run_one(index, source.as_ref(), convert);
                        if sender.send(outcome).is_err() {
                            log::warn!("worker {worker}: result channel closed");
                            break;
                        }
                    }
                });
            }
            // Only the workers hold senders now; the loop ends when they finish
            drop(sender);

            let mut outcomes = Vec::with_capacity(sources.len());
            for outcome in receiver {
                self.tick(&outcome);
                outcomes.push(outcome);
            }
            outcomes
        })
    }

    fn tick<T>(&self, outcome: &PageOutcome<T>) {
        if let Some(pb) = self.progress {
            pb.set_message(outcome.name.clone());
            pb.inc(1);
        }
    }
}

fn run_one<T, F>(index: usize, source: &dyn PageSource, convert: &F) -> PageOutcome<T>
where
    F: Fn(&dyn PageSource) -> Result<T>,
{
    let name = source.name();
    log::debug!("converting page {} ({name})", index + 1);
    PageOutcome {
        index,
        name,
        result: convert(source),
    }
}
