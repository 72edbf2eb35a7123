#[cfg(test)]
pub mod test {
    use std::{sync::Arc, thread, time::Duration};

    use crate::utils::channel::Channel;

    #[test]
    fn fifo_order() {
        let channel = Channel::new();
        for i in 0..5 {
            channel.put(i);
        }

        assert_eq!(5, channel.len());
        let drained: Vec<i32> = (0..5).map(|_| channel.get()).collect();
        assert_eq!(vec![0, 1, 2, 3, 4], drained);
        assert!(channel.is_empty());
        assert_eq!(None, channel.try_get());
    }

    #[test]
    fn get_blocks_until_put() {
        let channel = Arc::new(Channel::new());

        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.get())
        };

        thread::sleep(Duration::from_millis(50));
        channel.put("page");

        assert_eq!("page", consumer.join().unwrap());
    }

    #[test]
    fn producers_keep_their_own_order() {
        const PRODUCERS: usize = 4;
        const ITEMS: usize = 500;

        let channel: Arc<Channel<(usize, usize)>> = Arc::new(Channel::new());

        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let mut seen = vec![Vec::new(); PRODUCERS];
                for _ in 0..PRODUCERS * ITEMS {
                    let (producer, item) = channel.get();
                    seen[producer].push(item);
                }
                seen
            })
        };

        thread::scope(|scope| {
            for producer in 0..PRODUCERS {
                let channel = &channel;
                scope.spawn(move || {
                    for item in 0..ITEMS {
                        channel.put((producer, item));
                    }
                });
            }
        });

        let seen = consumer.join().unwrap();
        for items in seen {
            assert_eq!((0..ITEMS).collect::<Vec<_>>(), items);
        }
    }
}
