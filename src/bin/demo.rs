//! OPX 데모 - Open Peer Exchange
//!
//! 인메모리 기판 위에 노드 두 개를 띄워 발견 → 텍스트 교환 →
//! 파일 교환(재개 캐시 포함)을 한 프로세스 안에서 시연한다.
//!
//! 사용법:
//!   cargo run --release --bin opx-demo -- [OPTIONS]
//!
//! 예시:
//!   # 텍스트만 교환
//!   cargo run --release --bin opx-demo -- --text "hello"
//!
//!   # 파일 전송
//!   cargo run --release --bin opx-demo -- --file ./data.bin --dir /tmp/opx-demo

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use opx::transport::Transport;
use opx::{Config, Event, EventSender, MemHub, Node};

/// 데모 설정
struct DemoConfig {
    base_dir: PathBuf,
    text: String,
    file_path: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("opx-demo-data"),
            text: "안녕하세요".to_string(),
            file_path: None,
        }
    }
}

fn parse_args() -> DemoConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = DemoConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--dir" | "-d" => {
                if i + 1 < args.len() {
                    config.base_dir = PathBuf::from(&args[i + 1]);
                    i += 1;
                }
            }
            "--text" | "-t" => {
                if i + 1 < args.len() {
                    config.text = args[i + 1].clone();
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    config.file_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("옵션: --dir <경로> --text <내용> --file <경로>");
                std::process::exit(0);
            }
            other => {
                warn!("알 수 없는 옵션 무시: {}", other);
            }
        }
        i += 1;
    }

    config
}

/// 이벤트 출력 + 종료 이벤트 전달
fn spawn_printer(
    label: &'static str,
    mut rx: mpsc::UnboundedReceiver<Event>,
    done_tx: mpsc::UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            info!("[{}] {:?}", label, event);

            match &event {
                Event::TextSendDone { .. }
                | Event::TextSendError { .. }
                | Event::FileSendDone { .. }
                | Event::FileSendError { .. } => {
                    let _ = done_tx.send(event);
                }
                _ => {}
            }
        }
    });
}

async fn start_node(hub: &MemHub, base: &PathBuf, name: &str) -> (Node, mpsc::UnboundedReceiver<Event>) {
    let (events, rx) = EventSender::channel();
    let config = Config::new(
        base.join(name).join("private"),
        base.join(name).join("public"),
    );

    let hub = hub.clone();
    let node = Node::start(config, events, move |keypair| {
        let (transport, transport_events) = hub.register(&keypair.peer_id());
        Ok((transport as Arc<dyn Transport>, transport_events))
    })
    .await
    .expect("노드 시작 실패");

    (node, rx)
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("로깅 초기화 실패");

    let demo = parse_args();
    info!("데모 디렉터리: {}", demo.base_dir.display());

    let hub = MemHub::new();
    let (node_a, rx_a) = start_node(&hub, &demo.base_dir, "a").await;
    let (node_b, rx_b) = start_node(&hub, &demo.base_dir, "b").await;

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    spawn_printer("A", rx_a, done_tx.clone());
    spawn_printer("B", rx_b, done_tx);

    // 로컬 브로드캐스트 발견 흉내
    hub.announce(&node_b.peer_id()).await;

    // 생존 감시 대상 등록
    node_a.set_watch_list(vec![node_b.peer_id()]);

    let mut expected = 1usize;
    node_a.send_text(Uuid::new_v4().to_string(), node_b.peer_id(), demo.text.clone());

    if let Some(path) = &demo.file_path {
        expected += 1;
        node_a.send_file(Uuid::new_v4().to_string(), node_b.peer_id(), path.clone());
    }

    // 종료 이벤트 대기
    let mut seen = 0usize;
    while seen < expected {
        match tokio::time::timeout(Duration::from_secs(30), done_rx.recv()).await {
            Ok(Some(_)) => seen += 1,
            Ok(None) => break,
            Err(_) => {
                warn!("데모 대기 타임아웃");
                break;
            }
        }
    }

    // 상태 틱/감시 이벤트 한 바퀴 구경
    tokio::time::sleep(Duration::from_millis(1500)).await;

    node_a.stop().await;
    node_b.stop().await;
    info!("데모 종료");
}
