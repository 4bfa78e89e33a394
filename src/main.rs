use embed_bridge::config::BridgeConfig;
use embed_bridge::core::init_logging;
use embed_bridge::lifecycle::HostLifecycleObserver;
use embed_bridge::runtime::HeadlessRuntimeFactory;
use embed_bridge::EmbeddedRuntimeBridge;
use std::time::Duration;

/// 用无界面运行时演示一次完整的宿主生命周期
fn main() {
    let mut config = BridgeConfig::load_or_default();
    config.apply_env_overrides();
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }
    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to open log file: {}", e);
        std::process::exit(1);
    }

    let bridge = EmbeddedRuntimeBridge::shared();
    bridge.configure(&config);
    bridge.set_runtime_factory(HeadlessRuntimeFactory::new().on("Main", "Ping", |payload, sink| {
        sink.emit(format!("pong:{}", payload));
    }));
    bridge.set_message_callback(|message| {
        tracing::info!(target: "embed_bridge", "Runtime message: {}", message);
    });

    let observer = HostLifecycleObserver::new(bridge, config.lifecycle);

    bridge.initialize();
    bridge.send_message("Main", "Ping", "1");

    observer.on_enter_background();
    bridge.send_message("Main", "Ping", "2");
    observer.on_enter_foreground();

    std::thread::sleep(Duration::from_millis(100));
    bridge.pump_messages();
    observer.on_terminate();
}
