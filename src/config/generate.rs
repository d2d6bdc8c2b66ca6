pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# CALIPER-RELAY CONFIGURATION
# =============================================================================
# Each run reads new learner events from the event table, translates them into
# Caliper events, and posts them in batches to a Learning Record Warehouse.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/caliper-relay/config.yml
#   3. /etc/caliper-relay/config.yml
#
# Every value can also be set from the environment (DB_PATH, EVENT_TABLE,
# EVENT_TYPES, ACTION_TYPES, JOB_NAME, FIRST_RUNTIME, BATCH_SIZE, LRW_TYPE,
# LRW_SERVER, LRW_TOKEN, SENSOR_ID, ORGANIZATION, LRW_TIMEOUT, LRW_RETRIES).
# Environment values take precedence over this file. $env{VAR} references in
# this file are expanded before parsing.

database:
  # DuckDB database holding the event table and the run history table
  path: runestone.duckdb

source:
  table: useinfo
  # Rows must match one of these event types AND one of these action types
  event_types: [page]
  action_types: [view]

pipeline:
  # Name under which completed runs are recorded in cron_run_info
  job_name: caliper_sender
  # Watermark for the very first run of the job
  first_runtime: "2019-02-01 19:53:23"
  # Caliper events per HTTP request
  batch_size: 5

lrw:
  # 'unizin' posts to the server URL as-is.
  # 'ltitool' posts to <server>/caliper/event?key=<token>.
  type: ltitool
  server: https://lrw.example.edu
  token: $env{LRW_TOKEN}
  organization: Umich
  timeout: 30s
  # Extra attempts per batch after a failed delivery (0 = fail the run at once)
  retries: 0
  retry_interval: 1s
"#
    .to_string()
}
