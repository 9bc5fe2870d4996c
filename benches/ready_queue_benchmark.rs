/*!
 * Ready Queue Benchmarks
 *
 * Push/pop throughput of the multi-level ready queue, single-threaded and
 * under producer/consumer contention
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mlfq_kernel::{Dispatch, ProcessRecord, ReadyQueue, SchedulerConfig};
use std::sync::Arc;
use std::thread;

fn bench_push_pop_single_level(c: &mut Criterion) {
    let queue = ReadyQueue::new(&SchedulerConfig::default());
    let process = ProcessRecord::shared(1);

    c.bench_function("push_pop_single_level", |b| {
        b.iter(|| {
            queue.push(Arc::clone(&process)).unwrap();
            black_box(queue.pop());
        });
    });
}

fn bench_pop_scan_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("pop_scan_depth");

    for level in [0usize, 3] {
        let queue = ReadyQueue::new(&SchedulerConfig::default());
        let process = ProcessRecord::shared_at(1, level);

        group.bench_with_input(BenchmarkId::from_parameter(level), &level, |b, _| {
            b.iter(|| {
                queue.push(Arc::clone(&process)).unwrap();
                black_box(queue.try_pop());
            });
        });
    }

    group.finish();
}

fn bench_contended_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_throughput");
    group.sample_size(20);

    const ITEMS: u32 = 2_000;

    for threads in [2usize, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let queue = Arc::new(ReadyQueue::new(&SchedulerConfig::default()));

                let consumers: Vec<_> = (0..threads)
                    .map(|_| {
                        let queue = Arc::clone(&queue);
                        thread::spawn(move || {
                            let mut popped = 0u32;
                            while let Dispatch::Process(_) = queue.pop() {
                                popped += 1;
                            }
                            popped
                        })
                    })
                    .collect();

                let per_producer = ITEMS / threads as u32;
                let producers: Vec<_> = (0..threads as u32)
                    .map(|producer| {
                        let queue = Arc::clone(&queue);
                        thread::spawn(move || {
                            for i in 0..per_producer {
                                let pid = producer * per_producer + i;
                                let level = (pid % 4) as usize;
                                queue.push(ProcessRecord::shared_at(pid, level)).unwrap();
                            }
                        })
                    })
                    .collect();

                for producer in producers {
                    producer.join().unwrap();
                }
                for _ in 0..threads {
                    queue.push_poison_pill().unwrap();
                }
                let total: u32 = consumers.into_iter().map(|c| c.join().unwrap()).sum();
                black_box(total);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_push_pop_single_level,
    bench_pop_scan_depth,
    bench_contended_throughput
);
criterion_main!(benches);
