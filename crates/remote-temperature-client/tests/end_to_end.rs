//! Client and server talking over a real socket to a real database.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use remote_temperature_client::{RecorderClient, SanityBounds, ShutdownHandle};
use remote_temperature_rpc::RecorderProxy;
use remote_temperature_sensors::w1::W1SensorSource;
use remote_temperature_sensors::{
    Error as SensorError, Result as SensorResult, Sensor, SensorSource,
};
use remote_temperature_server::{rpc, Recorder, Storage};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Span;

struct Server {
    url: String,
    stop: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
    recorder: Arc<Recorder>,
}

impl Server {
    async fn start(database: &Path) -> Self {
        let storage = Storage::open(database, Span::none()).await.unwrap();
        let recorder = Arc::new(Recorder::new(storage, Span::none()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/RPC2", listener.local_addr().unwrap());
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(rpc::serve(listener, recorder.clone(), async move {
            let _ = stopped.await;
        }));
        Self {
            url,
            stop,
            task,
            recorder,
        }
    }

    async fn stop(self) {
        let _ = self.stop.send(());
        self.task.await.unwrap().unwrap();
        self.recorder.storage().close().await;
    }
}

/// Yields scripted readings. Once they run out every read fails and asks the
/// client to stop.
struct ScriptedSensor {
    readings: Mutex<VecDeque<f64>>,
    shutdown: OnceLock<ShutdownHandle>,
}

impl Sensor for ScriptedSensor {
    fn id(&self) -> &str {
        "scripted"
    }

    fn temperature(&self) -> SensorResult<f64> {
        match self.readings.lock().unwrap().pop_front() {
            Some(reading) => Ok(reading),
            None => {
                if let Some(handle) = self.shutdown.get() {
                    handle.request_shutdown();
                }
                Err(SensorError::Unavailable("scripted".to_string()))
            }
        }
    }
}

struct OneSensor(Arc<ScriptedSensor>);

impl SensorSource for OneSensor {
    fn available_sensors(&self) -> SensorResult<Vec<Arc<dyn Sensor>>> {
        Ok(vec![self.0.clone() as Arc<dyn Sensor>])
    }
}

async fn stored_rows(database: &Path) -> Vec<(String, String, f64, f64)> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(SqliteConnectOptions::new().filename(database))
        .await
        .unwrap();
    let rows = sqlx::query_as::<_, (String, String, f64, f64)>(
        "SELECT device_id, sensor_id, time, temperature FROM temperatures ORDER BY time, rowid",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    pool.close().await;
    rows
}

#[tokio::test]
async fn test_readings_reach_database() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("temperatures.db");
    let server = Server::start(&database).await;

    let sensor = Arc::new(ScriptedSensor {
        readings: Mutex::new(VecDeque::from([22.0, 23.0, 24.0, 25.0, 26.0])),
        shutdown: OnceLock::new(),
    });
    let client = RecorderClient::new(
        "greenhouse",
        Duration::from_millis(100),
        SanityBounds::new(Some(-15.0), Some(100.0)),
        OneSensor(sensor.clone()),
        RecorderProxy::new(&server.url).unwrap(),
        Span::none(),
    );
    let _ = sensor.shutdown.set(client.shutdown_handle());

    tokio::time::timeout(Duration::from_secs(10), client.run_forever())
        .await
        .expect("client did not stop after its last reading");
    server.stop().await;

    let rows = stored_rows(&database).await;
    let temperatures: Vec<f64> = rows.iter().map(|row| row.3).collect();
    assert_eq!(temperatures, vec![22.0, 23.0, 24.0, 25.0, 26.0]);
    for (device_id, sensor_id, time, _) in &rows {
        assert_eq!(device_id, "greenhouse");
        assert_eq!(sensor_id, "scripted");
        assert!(*time > 0.0);
    }
    assert!(rows.windows(2).all(|pair| pair[0].2 < pair[1].2));
}

#[tokio::test]
async fn test_w1_bus_poll_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("temperatures.db");
    let bus = dir.path().join("w1");
    fs::create_dir(&bus).unwrap();

    let slave = |name: &str, content: &str| {
        let slave_dir = bus.join(name);
        fs::create_dir(&slave_dir).unwrap();
        fs::write(slave_dir.join("w1_slave"), content).unwrap();
    };
    slave(
        "28-000000000001",
        "72 01 4b 46 7f ff 0e 10 57 : crc=57 YES\n72 01 4b 46 7f ff 0e 10 57 t=23125\n",
    );
    slave(
        "28-000000000002",
        "72 01 4b 46 7f ff 0e 10 57 : crc=57 NO\n72 01 4b 46 7f ff 0e 10 57 t=23125\n",
    );
    slave(
        "28-000000000003",
        "50 05 4b 46 7f ff 0c 10 1c : crc=1c YES\n50 05 4b 46 7f ff 0c 10 1c t=85000\n",
    );
    slave(
        "28-000000000004",
        "90 fc 4b 46 7f ff 0c 10 1c : crc=1c YES\n90 fc 4b 46 7f ff 0c 10 1c t=-55000\n",
    );
    fs::create_dir(bus.join("w1_bus_master1")).unwrap();

    let server = Server::start(&database).await;
    let client = RecorderClient::new(
        "loft",
        Duration::from_secs(60),
        SanityBounds::new(Some(-15.0), Some(100.0)),
        W1SensorSource::new(&bus),
        RecorderProxy::new(&server.url).unwrap(),
        Span::none(),
    );

    client.poll_cycle().await;
    server.stop().await;

    // Not ready, reset value and out of bounds readings are dropped.
    let rows = stored_rows(&database).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].0, "loft");
    assert_eq!(rows[0].1, "000000000001");
    assert_eq!(rows[0].3, 23.125);
}

#[tokio::test]
async fn test_unreachable_server_does_not_stop_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let sensor = Arc::new(ScriptedSensor {
        readings: Mutex::new(VecDeque::from([20.0, 21.0])),
        shutdown: OnceLock::new(),
    });
    let client = RecorderClient::new(
        "shed",
        Duration::from_millis(10),
        SanityBounds::unbounded(),
        OneSensor(sensor.clone()),
        RecorderProxy::with_timeout(&url, Duration::from_secs(1)).unwrap(),
        Span::none(),
    );
    let _ = sensor.shutdown.set(client.shutdown_handle());

    tokio::time::timeout(Duration::from_secs(10), client.run_forever())
        .await
        .expect("client did not keep polling after transport failures");
    assert!(sensor.readings.lock().unwrap().is_empty());
}
