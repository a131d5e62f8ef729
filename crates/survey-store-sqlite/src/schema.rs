//! SQL schema for the survey SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Studies and transports are keyed by their user-supplied codes.
CREATE TABLE IF NOT EXISTS studies (
    code TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS transports (
    code TEXT PRIMARY KEY
);

-- Links are never deleted and their key columns never change; only the
-- measurements are overwritten. Exactly one of destination_road (junctions)
-- and milepost (everything else) is set.
CREATE TABLE IF NOT EXISTS links (
    link_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    category         TEXT NOT NULL,   -- three-character category code
    direction        TEXT NOT NULL,   -- e.g. 'NORTH -> SOUTH'
    origin_road      TEXT NOT NULL,
    destination_road TEXT,
    milepost         TEXT,            -- canonical decimal, '.' separator
    coordinates      TEXT,
    length           TEXT,            -- metres, canonical decimal
    width            TEXT,            -- metres, canonical decimal
    measured_at      TEXT,            -- ISO 8601 UTC
    CHECK ((destination_road IS NULL) != (milepost IS NULL)),
    CHECK ((length IS NULL) = (width IS NULL) AND (width IS NULL) = (measured_at IS NULL))
);

-- Natural key. Concurrent inserts of the same link collide here.
CREATE UNIQUE INDEX IF NOT EXISTS links_natural_key ON links (
    origin_road, category, direction,
    IFNULL(destination_road, ''), IFNULL(milepost, '')
);

CREATE TABLE IF NOT EXISTS plans (
    plan_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    transport_code TEXT    NOT NULL REFERENCES transports(code),
    link_id        INTEGER NOT NULL REFERENCES links(link_id),
    coordinates    TEXT,
    UNIQUE (transport_code, link_id)
);

-- At most one study per plan: plan_id is the primary key.
CREATE TABLE IF NOT EXISTS plan_studies (
    plan_id       INTEGER PRIMARY KEY REFERENCES plans(plan_id),
    study_code    TEXT NOT NULL REFERENCES studies(code),
    associated_at TEXT NOT NULL    -- ISO 8601 UTC
);

CREATE INDEX IF NOT EXISTS plan_studies_study_idx ON plan_studies(study_code);

PRAGMA user_version = 1;
";
