use super::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn pops_in_push_order() {
    let queue = BlockingQueue::with_capacity(4);
    for i in 0..10 {
        assert!(queue.push_back(i));
    }
    assert_eq!(queue.len(), 10);
    let popped: Vec<i32> = (0..10).filter_map(|_| queue.pop_front()).collect();
    assert_eq!(popped, (0..10).collect::<Vec<_>>());
    assert!(queue.is_empty());
}

#[test]
fn pop_waits_for_a_push() {
    let queue = Arc::new(BlockingQueue::with_capacity(1));
    let consumer = {
        let queue = queue.clone();
        std::thread::spawn(move || queue.pop_front())
    };
    std::thread::sleep(Duration::from_millis(30));
    assert!(!consumer.is_finished());

    queue.push_back("save");
    assert_eq!(consumer.join().unwrap(), Some("save"));
}

#[test]
fn close_wakes_the_consumer_after_draining() {
    let queue = Arc::new(BlockingQueue::with_capacity(2));
    queue.push_back(1);
    queue.push_back(2);
    queue.close();
    assert!(!queue.push_back(3));

    assert_eq!(queue.pop_front(), Some(1));
    assert_eq!(queue.pop_front(), Some(2));
    assert_eq!(queue.pop_front(), None);

    let idle = Arc::new(BlockingQueue::<u8>::with_capacity(1));
    let consumer = {
        let idle = idle.clone();
        std::thread::spawn(move || idle.pop_front())
    };
    std::thread::sleep(Duration::from_millis(20));
    idle.close();
    assert_eq!(consumer.join().unwrap(), None);
}

#[test]
fn many_producers_one_consumer_lose_nothing() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 500;

    let queue = Arc::new(BlockingQueue::with_capacity(8));
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            std::thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push_back((p, i));
                }
            })
        })
        .collect();

    let consumer = {
        let queue = queue.clone();
        std::thread::spawn(move || {
            let mut seen = Vec::with_capacity(PRODUCERS * PER_PRODUCER);
            while let Some(item) = queue.pop_front() {
                seen.push(item);
            }
            seen
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    queue.close();
    let seen = consumer.join().unwrap();

    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    for p in 0..PRODUCERS {
        let from_p: Vec<usize> = seen.iter().filter(|(q, _)| *q == p).map(|(_, i)| *i).collect();
        assert_eq!(from_p, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}
