use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                email       TEXT NOT NULL UNIQUE COLLATE NOCASE,
                role        TEXT NOT NULL,
                password    TEXT,
                verified    INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_users_role ON users(role, created_at);

            CREATE TABLE campaigns (
                id           TEXT PRIMARY KEY,
                title        TEXT NOT NULL,
                description  TEXT NOT NULL,
                category     TEXT NOT NULL,
                goal         INTEGER NOT NULL CHECK (goal > 0),
                raised       INTEGER NOT NULL DEFAULT 0,
                donor_count  INTEGER NOT NULL DEFAULT 0 CHECK (donor_count >= 0),
                status       TEXT NOT NULL DEFAULT 'pending',
                active       INTEGER NOT NULL DEFAULT 0,
                verified     INTEGER NOT NULL DEFAULT 0,
                created_by   TEXT NOT NULL,
                deadline     TEXT,
                created_at   TEXT NOT NULL,
                CHECK (active = 0 OR status = 'active')
            );

            CREATE INDEX idx_campaigns_status ON campaigns(status, created_at);

            CREATE TABLE requests (
                id                 TEXT PRIMARY KEY,
                user_id            TEXT NOT NULL,
                category           TEXT NOT NULL,
                title              TEXT NOT NULL,
                description        TEXT NOT NULL,
                kind               TEXT NOT NULL,
                lat                REAL,
                lng                REAL,
                address            TEXT,
                status             TEXT NOT NULL DEFAULT 'pending',
                urgency            TEXT NOT NULL DEFAULT 'medium',
                amount             INTEGER,
                sanctioned_amount  INTEGER,
                accepted_by        TEXT,
                accepted_at        TEXT,
                completed          INTEGER NOT NULL DEFAULT 0,
                approved_by        TEXT,
                approved_at        TEXT,
                rejected_by        TEXT,
                rejected_at        TEXT,
                rejection_reason   TEXT,
                sanctioned_at      TEXT,
                completed_at       TEXT,
                created_at         TEXT NOT NULL,
                CHECK (sanctioned_amount IS NULL OR sanctioned_amount <= amount),
                CHECK (completed = 0 OR status = 'completed')
            );

            CREATE INDEX idx_requests_status ON requests(status, created_at);

            CREATE TABLE request_proofs (
                request_id  TEXT NOT NULL REFERENCES requests(id),
                position    INTEGER NOT NULL,
                proof_ref   TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (request_id, position)
            );

            CREATE TABLE transactions (
                id            TEXT PRIMARY KEY,
                donor_id      TEXT NOT NULL,
                receiver_id   TEXT NOT NULL,
                campaign_id   TEXT NOT NULL REFERENCES campaigns(id),
                amount        INTEGER NOT NULL CHECK (amount > 0),
                is_anonymous  INTEGER NOT NULL DEFAULT 0,
                qr_code       TEXT UNIQUE,
                track_url     TEXT,
                impact_story  TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'completed',
                payment_id    TEXT NOT NULL,
                created_at    TEXT NOT NULL,
                CHECK ((is_anonymous = 1) = (qr_code IS NOT NULL))
            );

            CREATE INDEX idx_transactions_campaign ON transactions(campaign_id, created_at);
            CREATE INDEX idx_transactions_donor ON transactions(donor_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
