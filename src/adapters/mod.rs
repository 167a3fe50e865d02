//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements          | Connects to                 |
//! |-----------------|---------------------|-----------------------------|
//! | `ble`           | (used by probes)    | Bluedroid GAP scanner       |
//! | `console`       | ConsolePort         | stdio console (UART / USB)  |
//! | `device_id`     | -                   | eFuse factory MAC           |
//! | `file_server`   | FileServerPort      | SoftAP + `http_listener`    |
//! | `flash_fs`      | FileStorePort       | SPIFFS / host directory     |
//! | `http_listener` | -                   | non-blocking TCP socket     |
//! | `log_sink`      | EventSink           | Serial log output           |
//! | `nvs`           | ConfigPort          | NVS / in-memory store       |
//! |                 | StoragePort         |                             |
//! | `system`        | SystemPort          | esp_restart / deep sleep    |
//! | `time`          | ClockPort, DelayNs  | ESP32 system timer          |
//! | `wifi`          | (shared radio)      | ESP-IDF WiFi STA + SoftAP   |

pub mod ble;
pub mod console;
pub mod device_id;
pub mod file_server;
pub mod flash_fs;
pub mod http_listener;
pub mod log_sink;
pub mod nvs;
pub mod system;
pub mod time;
pub(super) mod utils;
pub mod wifi;
