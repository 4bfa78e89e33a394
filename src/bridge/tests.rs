//! 桥接状态机单元测试

use super::*;
use crate::config::MessagingConfig;
use crate::runtime::{HeadlessRuntimeFactory, OutboundMessage};
use crossbeam_channel::unbounded;
use raw_window_handle::{RawWindowHandle, WebWindowHandle};
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::Duration;

/// 运行时调用记录
#[derive(Default)]
struct Probe {
    constructions: u32,
    starts: u32,
    shutdowns: u32,
    sent: Vec<OutboundMessage>,
    pause_calls: Vec<bool>,
    sinks: Vec<MessageSink>,
    fail_create: bool,
    fail_start: bool,
    panic_on_send: bool,
    panic_on_pause: bool,
    panic_on_shutdown: bool,
}

struct RecordingRuntime {
    surface_id: u32,
    probe: Arc<Mutex<Probe>>,
}

impl EmbeddedRuntime for RecordingRuntime {
    fn attach_sink(&mut self, sink: MessageSink) {
        self.probe.lock().unwrap().sinks.push(sink);
    }

    fn start(&mut self) -> RuntimeResult<()> {
        let mut probe = self.probe.lock().unwrap();
        probe.starts += 1;
        if probe.fail_start {
            return Err(RuntimeError::StartFailed("graphics device lost".into()));
        }
        Ok(())
    }

    fn send_message(&mut self, message: &OutboundMessage) {
        let explode = {
            let mut probe = self.probe.lock().unwrap();
            probe.sent.push(message.clone());
            probe.panic_on_send
        };
        if explode {
            panic!("send_message failed");
        }
    }

    fn set_paused(&mut self, paused: bool) {
        let explode = {
            let mut probe = self.probe.lock().unwrap();
            probe.pause_calls.push(paused);
            probe.panic_on_pause
        };
        if explode {
            panic!("set_paused failed");
        }
    }

    fn shutdown(&mut self) {
        let explode = {
            let mut probe = self.probe.lock().unwrap();
            probe.shutdowns += 1;
            probe.panic_on_shutdown
        };
        if explode {
            panic!("shutdown failed");
        }
    }

    fn root_view(&self) -> Option<RootView> {
        Some(RootView::from_raw(RawWindowHandle::Web(WebWindowHandle::new(
            self.surface_id,
        ))))
    }

    fn root_window(&self) -> Option<RootWindow> {
        Some(RootWindow::from_raw(RawWindowHandle::Web(WebWindowHandle::new(
            self.surface_id + 1000,
        ))))
    }
}

fn recording_bridge(config: &BridgeConfig) -> (EmbeddedRuntimeBridge, Arc<Mutex<Probe>>) {
    let probe = Arc::new(Mutex::new(Probe::default()));
    let p = Arc::clone(&probe);
    let factory = move || -> RuntimeResult<Box<dyn EmbeddedRuntime>> {
        let mut guard = p.lock().unwrap();
        if guard.fail_create {
            return Err(RuntimeError::Unavailable("no device".into()));
        }
        guard.constructions += 1;
        Ok(Box::new(RecordingRuntime {
            surface_id: guard.constructions,
            probe: Arc::clone(&p),
        }))
    };
    (EmbeddedRuntimeBridge::with_config(factory, config), probe)
}

fn bridge() -> (EmbeddedRuntimeBridge, Arc<Mutex<Probe>>) {
    recording_bridge(&BridgeConfig::default())
}

fn last_sink(probe: &Arc<Mutex<Probe>>) -> MessageSink {
    probe.lock().unwrap().sinks.last().cloned().unwrap()
}

#[test]
fn test_initial_state() {
    let (bridge, _) = bridge();
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert!(!bridge.is_initialized());
    assert!(bridge.instance_id().is_none());
    assert!(bridge.unity_root_view().is_none());
    assert!(bridge.unity_window().is_none());
}

#[test]
fn test_initialize_is_idempotent() {
    let (bridge, probe) = bridge();

    bridge.initialize();
    let first = bridge.instance_id();
    bridge.initialize();

    assert!(bridge.is_initialized());
    assert_eq!(bridge.state(), LifecycleState::Active);
    assert_eq!(bridge.instance_id(), first);
    assert_eq!(probe.lock().unwrap().constructions, 1);
    assert_eq!(probe.lock().unwrap().starts, 1);
}

#[test]
fn test_send_message_reaches_runtime() {
    let (bridge, probe) = bridge();
    bridge.initialize();

    bridge.send_message("Main", "Ping", "1");

    let sent = probe.lock().unwrap().sent.clone();
    assert_eq!(sent, vec![OutboundMessage::new("Main", "Ping", "1")]);
}

#[test]
fn test_send_before_initialize_is_noop() {
    let (bridge, probe) = bridge();

    bridge.send_message("Main", "Ping", "1");
    assert_eq!(
        bridge.try_send_message("Main", "Ping", "1"),
        Err(BridgeError::NotInitialized {
            operation: "send_message"
        })
    );

    assert_eq!(probe.lock().unwrap().constructions, 0);
    assert!(probe.lock().unwrap().sent.is_empty());
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_send_while_paused_is_forwarded() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    bridge.pause(true);

    bridge.send_message("Main", "Ping", "paused");
    assert_eq!(probe.lock().unwrap().sent.len(), 1);
}

#[test]
fn test_pause_transitions_and_idempotence() {
    let (bridge, probe) = bridge();
    bridge.initialize();

    // 从未暂停时恢复是空操作
    bridge.pause(false);
    assert_eq!(bridge.state(), LifecycleState::Active);

    bridge.pause(true);
    bridge.pause(true);
    assert_eq!(bridge.state(), LifecycleState::Paused);
    assert!(bridge.is_initialized());

    bridge.pause(false);
    assert_eq!(bridge.state(), LifecycleState::Active);

    assert_eq!(probe.lock().unwrap().pause_calls, vec![true, false]);
}

#[test]
fn test_pause_before_initialize_is_noop() {
    let (bridge, probe) = bridge();
    bridge.pause(true);
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert!(probe.lock().unwrap().pause_calls.is_empty());
}

#[test]
fn test_unload_restores_uninitialized() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    assert!(bridge.unity_root_view().is_some());

    bridge.unload();

    assert!(!bridge.is_initialized());
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert!(bridge.unity_root_view().is_none());
    assert!(bridge.unity_window().is_none());
    assert_eq!(probe.lock().unwrap().shutdowns, 1);

    // 重复卸载为空操作
    bridge.unload();
    assert_eq!(probe.lock().unwrap().shutdowns, 1);
}

#[test]
fn test_unload_from_paused() {
    let (bridge, _) = bridge();
    bridge.initialize();
    bridge.pause(true);
    bridge.unload();
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_reinitialize_creates_fresh_runtime() {
    let (bridge, probe) = bridge();

    bridge.initialize();
    let first_id = bridge.instance_id().unwrap();
    let first_view = bridge.unity_root_view().unwrap();

    bridge.unload();
    bridge.initialize();
    let second_id = bridge.instance_id().unwrap();
    let second_view = bridge.unity_root_view().unwrap();

    assert_ne!(first_id, second_id);
    assert!(second_id > first_id);
    assert_ne!(first_view, second_view);
    assert_eq!(probe.lock().unwrap().constructions, 2);
}

#[test]
fn test_reinitialize_resets_pause_state() {
    let (bridge, _) = bridge();
    bridge.initialize();
    bridge.pause(true);
    bridge.unload();
    bridge.initialize();
    assert_eq!(bridge.state(), LifecycleState::Active);
}

#[test]
fn test_construction_failure_leaves_uninitialized() {
    let (bridge, probe) = bridge();
    probe.lock().unwrap().fail_create = true;

    bridge.initialize();
    assert!(!bridge.is_initialized());
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert!(matches!(
        bridge.try_initialize(),
        Err(BridgeError::Construction(RuntimeError::Unavailable(_)))
    ));

    // 宿主可以重试
    probe.lock().unwrap().fail_create = false;
    bridge.initialize();
    assert!(bridge.is_initialized());
}

#[test]
fn test_start_failure_shuts_runtime_down() {
    let (bridge, probe) = bridge();
    probe.lock().unwrap().fail_start = true;

    assert!(matches!(
        bridge.try_initialize(),
        Err(BridgeError::Start(RuntimeError::StartFailed(_)))
    ));
    assert!(!bridge.is_initialized());

    let probe = probe.lock().unwrap();
    assert_eq!(probe.shutdowns, 1);
    assert!(!probe.sinks[0].is_attached());
}

#[test]
fn test_panicking_factory_is_contained() {
    let factory = || -> RuntimeResult<Box<dyn EmbeddedRuntime>> { panic!("engine exploded") };
    let bridge = EmbeddedRuntimeBridge::new(factory);

    bridge.initialize();
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert!(matches!(
        bridge.try_initialize(),
        Err(BridgeError::Construction(RuntimeError::Other(_)))
    ));
}

#[test]
fn test_no_factory_stays_uninitialized() {
    let bridge = EmbeddedRuntimeBridge::build(None, &BridgeConfig::default());
    assert!(!bridge.has_runtime_factory());
    assert_eq!(bridge.try_initialize(), Err(BridgeError::NoRuntimeFactory));
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_callback_receives_runtime_messages() {
    let (bridge, probe) = bridge();
    let received = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&received);
    bridge.set_message_callback(move |msg| r.lock().unwrap().push(msg.to_string()));

    bridge.initialize();
    last_sink(&probe).emit("score:42");

    assert_eq!(*received.lock().unwrap(), vec!["score:42"]);
}

#[test]
fn test_callback_replacement() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    let sink = last_sink(&probe);

    let first = Arc::new(Mutex::new(Vec::new()));
    let second = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::clone(&first);
    let s = Arc::clone(&second);

    bridge.set_message_callback(move |msg| f.lock().unwrap().push(msg.to_string()));
    sink.emit("score:42");
    bridge.set_message_callback(move |msg| s.lock().unwrap().push(msg.to_string()));
    sink.emit("score:43");

    assert_eq!(*first.lock().unwrap(), vec!["score:42"]);
    assert_eq!(*second.lock().unwrap(), vec!["score:43"]);
}

#[test]
fn test_stale_sink_is_detached_after_unload() {
    let (bridge, probe) = bridge();
    let received = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&received);
    bridge.set_message_callback(move |msg| r.lock().unwrap().push(msg.to_string()));

    bridge.initialize();
    let stale = last_sink(&probe);
    bridge.unload();
    bridge.initialize();
    let fresh = last_sink(&probe);

    assert!(!stale.emit("old"));
    assert!(fresh.emit("new"));
    assert_eq!(*received.lock().unwrap(), vec!["new"]);
}

#[test]
fn test_host_queue_delivery() {
    let mut config = BridgeConfig::default();
    config.messaging = MessagingConfig {
        delivery: DeliveryMode::HostQueue,
        queue_capacity: 0,
    };
    let (bridge, probe) = recording_bridge(&config);
    let received = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&received);
    bridge.set_message_callback(move |msg| r.lock().unwrap().push(msg.to_string()));

    bridge.initialize();
    let sink = last_sink(&probe);
    sink.emit("a");
    sink.emit("b");
    assert!(received.lock().unwrap().is_empty());

    assert_eq!(bridge.pump_messages(), 2);
    assert_eq!(*received.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn test_unload_discards_queued_messages() {
    let mut config = BridgeConfig::default();
    config.messaging.delivery = DeliveryMode::HostQueue;
    let (bridge, probe) = recording_bridge(&config);
    bridge.set_message_callback(|_| {});

    bridge.initialize();
    last_sink(&probe).emit("stale");
    bridge.unload();

    assert_eq!(bridge.pump_messages(), 0);
}

#[test]
fn test_configure_only_when_uninitialized() {
    let (bridge, _) = bridge();
    let mut config = BridgeConfig::default();
    config.messaging.delivery = DeliveryMode::HostQueue;

    bridge.initialize();
    assert!(!bridge.configure(&config));
    assert_eq!(bridge.delivery_mode(), DeliveryMode::Immediate);

    bridge.unload();
    assert!(bridge.configure(&config));
    assert_eq!(bridge.delivery_mode(), DeliveryMode::HostQueue);
}

#[test]
fn test_drop_shuts_runtime_down() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    drop(bridge);
    assert_eq!(probe.lock().unwrap().shutdowns, 1);
}

#[test]
fn test_shared_is_singleton() {
    let a = EmbeddedRuntimeBridge::shared();
    let b = EmbeddedRuntimeBridge::shared();
    assert!(std::ptr::eq(a, b));
}

#[test]
fn test_shared_concurrent_access_yields_one_instance() {
    const THREADS: usize = 16;
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                EmbeddedRuntimeBridge::shared() as *const EmbeddedRuntimeBridge as usize
            })
        })
        .collect();
    let addresses: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let expected = EmbeddedRuntimeBridge::shared() as *const EmbeddedRuntimeBridge as usize;
    assert!(addresses.iter().all(|&addr| addr == expected));
}

#[test]
fn test_invalid_messaging_config_falls_back() {
    let mut config = BridgeConfig::default();
    config.messaging = MessagingConfig {
        delivery: DeliveryMode::HostQueue,
        queue_capacity: usize::MAX,
    };

    let (bridge, _) = recording_bridge(&config);
    assert_eq!(bridge.delivery_mode(), DeliveryMode::Immediate);

    assert!(!bridge.configure(&config));
    assert_eq!(bridge.delivery_mode(), DeliveryMode::Immediate);

    config.messaging.queue_capacity = 16;
    assert!(bridge.configure(&config));
    assert_eq!(bridge.delivery_mode(), DeliveryMode::HostQueue);
}

#[test]
fn test_panicking_send_is_contained() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    probe.lock().unwrap().panic_on_send = true;

    bridge.send_message("Main", "Ping", "1");
    assert_eq!(
        bridge.try_send_message("Main", "Ping", "2"),
        Err(BridgeError::RuntimePanicked {
            operation: "send_message"
        })
    );
    assert!(bridge.is_initialized());
    assert_eq!(probe.lock().unwrap().sent.len(), 2);
}

#[test]
fn test_panicking_pause_keeps_state() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    probe.lock().unwrap().panic_on_pause = true;

    bridge.pause(true);
    assert_eq!(bridge.state(), LifecycleState::Active);

    probe.lock().unwrap().panic_on_pause = false;
    bridge.pause(true);
    assert_eq!(bridge.state(), LifecycleState::Paused);
}

#[test]
fn test_panicking_shutdown_still_unloads() {
    let (bridge, probe) = bridge();
    bridge.initialize();
    probe.lock().unwrap().panic_on_shutdown = true;

    bridge.unload();
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert!(!bridge.is_initialized());

    // 可以重新初始化
    bridge.initialize();
    assert!(bridge.is_initialized());
    assert_eq!(probe.lock().unwrap().constructions, 2);
}

#[test]
fn test_panicking_shutdown_after_failed_start() {
    let (bridge, probe) = bridge();
    {
        let mut guard = probe.lock().unwrap();
        guard.fail_start = true;
        guard.panic_on_shutdown = true;
    }

    assert!(matches!(
        bridge.try_initialize(),
        Err(BridgeError::Start(RuntimeError::StartFailed(_)))
    ));
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
    assert_eq!(probe.lock().unwrap().shutdowns, 1);
}

#[test]
fn test_unload_while_callback_queries_bridge() {
    const TIMEOUT: Duration = Duration::from_secs(3);

    let factory = HeadlessRuntimeFactory::new().on("Main", "Ready", |_, sink| {
        sink.emit("ready");
    });
    let bridge = Arc::new(EmbeddedRuntimeBridge::new(factory));
    let weak = Arc::downgrade(&bridge);
    let (entered_tx, entered_rx) = unbounded();
    let (answer_tx, answer_rx) = unbounded();
    bridge.set_message_callback(move |_| {
        let _ = entered_tx.send(());
        thread::sleep(Duration::from_millis(100));
        if let Some(bridge) = weak.upgrade() {
            let _ = answer_tx.send(bridge.is_initialized());
        }
    });

    bridge.initialize();
    bridge.send_message("Main", "Ready", "");
    entered_rx.recv_timeout(TIMEOUT).unwrap();

    // 回调仍在运行时线程上执行时卸载
    let (done_tx, done_rx) = unbounded();
    let unloading = Arc::clone(&bridge);
    thread::spawn(move || {
        unloading.unload();
        let _ = done_tx.send(());
    });

    assert!(done_rx.recv_timeout(TIMEOUT).is_ok());
    assert!(answer_rx.recv_timeout(TIMEOUT).is_ok());
    assert_eq!(bridge.state(), LifecycleState::Uninitialized);
}

#[test]
fn test_concurrent_initialize_constructs_once() {
    let (bridge, probe) = bridge();
    let bridge = Arc::new(bridge);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let bridge = Arc::clone(&bridge);
            std::thread::spawn(move || bridge.initialize())
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(bridge.is_initialized());
    assert_eq!(probe.lock().unwrap().constructions, 1);
}
