//! PostgreSQL catalog source.
//!
//! Holds exactly one connection for the duration of a run. All catalog
//! reads go through `information_schema` except enum members, which only
//! `pg_catalog` exposes with their defined sort order.

use std::sync::Arc;

use async_trait::async_trait;
use rustls::ClientConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Connection, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, info, warn};

use super::{
    ColumnMeta, ConstraintInfo, ConstraintKind, EnumMember, KeyUsage, ReferencedColumn,
    SchemaSource,
};
use crate::config::DatabaseConfig;
use crate::error::{Result, TypegenError};

/// Enum types from every schema, not only the selected ones: a column in an
/// included schema may use an enum declared elsewhere.
const ENUM_MEMBERS_QUERY: &str = r#"
    SELECT n.nspname::text, t.typname::text, e.enumlabel::text
    FROM pg_catalog.pg_type t
    JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
    JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
    ORDER BY t.typname COLLATE "C", n.nspname COLLATE "C", e.enumsortorder
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.table_schema::text,
        c.table_name::text,
        c.column_name::text,
        c.is_nullable::text = 'YES',
        c.column_default::text,
        c.data_type::text,
        c.udt_name::text,
        c.udt_schema::text
    FROM information_schema.columns c
    WHERE c.table_schema::text = ANY($1::text[])
      AND NOT (c.table_schema::text = ANY($2::text[]))
      AND NOT (c.table_name::text = ANY($3::text[]))
    ORDER BY c.table_schema::text COLLATE "C",
             c.table_name::text COLLATE "C",
             c.ordinal_position
"#;

const CONSTRAINTS_QUERY: &str = r#"
    SELECT tc.constraint_schema::text, tc.constraint_name::text, tc.constraint_type::text
    FROM information_schema.table_constraints tc
    WHERE tc.constraint_schema::text = $1::text
      AND tc.constraint_type::text = ANY($2::text[])
    ORDER BY tc.constraint_name::text COLLATE "C"
"#;

const KEY_USAGE_QUERY: &str = r#"
    SELECT k.table_schema::text, k.table_name::text, k.column_name::text, k.constraint_name::text
    FROM information_schema.key_column_usage k
    WHERE k.constraint_schema::text = $1::text
      AND k.constraint_name::text = ANY($2::text[])
    ORDER BY k.table_name::text COLLATE "C",
             k.constraint_name::text COLLATE "C",
             k.ordinal_position
"#;

const REFERENCED_COLUMNS_QUERY: &str = r#"
    SELECT
        u.constraint_schema::text,
        u.table_schema::text,
        u.table_name::text,
        u.column_name::text,
        u.constraint_name::text
    FROM information_schema.constraint_column_usage u
    WHERE u.constraint_name::text = ANY($1::text[])
    ORDER BY u.constraint_schema::text COLLATE "C",
             u.constraint_name::text COLLATE "C",
             u.table_schema::text COLLATE "C",
             u.table_name::text COLLATE "C",
             u.column_name::text COLLATE "C"
"#;

/// Catalog source over a single PostgreSQL connection.
pub struct PgSchemaSource {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
    label: String,
}

impl PgSchemaSource {
    /// Open the connection and verify it with a trivial query.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let pg_config = config.pg_config();
        let label = format!("{}:{}/{}", config.host, config.port, config.database);

        let (client, connection) = match config.ssl_mode.as_str() {
            "disable" => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(|e| TypegenError::connection(e, format!("connecting to {}", label)))?;
                (client, spawn_connection(connection))
            }
            ssl_mode => {
                let tls = MakeRustlsConnect::new(build_tls_config(ssl_mode)?);
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| TypegenError::connection(e, format!("connecting to {}", label)))?;
                (client, spawn_connection(connection))
            }
        };

        client.simple_query("SELECT 1").await?;
        info!("Connected to PostgreSQL catalog: {}", label);

        Ok(Self {
            client: Some(client),
            connection: Some(connection),
            label,
        })
    }

    fn client(&self) -> Result<&Client> {
        self.client.as_ref().ok_or_else(|| {
            TypegenError::connection("connection already released", self.label.clone())
        })
    }
}

/// Drive the connection on its own task until the client is dropped.
fn spawn_connection<S, T>(connection: Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("PostgreSQL connection closed with error: {}", e);
        }
    })
}

/// Build TLS configuration based on ssl_mode.
fn build_tls_config(ssl_mode: &str) -> Result<ClientConfig> {
    let config = match ssl_mode {
        "require" => {
            warn!("ssl_mode=require: TLS enabled but server certificate is not verified.");
            ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth()
        }
        "verify-ca" | "verify-full" => {
            let mut root_store = rustls::RootCertStore::empty();
            root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        }
        other => {
            return Err(TypegenError::Config(format!(
                "Invalid ssl_mode '{}'. Valid options: disable, require, verify-ca, verify-full",
                other
            )));
        }
    };

    Ok(config)
}

#[async_trait]
impl SchemaSource for PgSchemaSource {
    async fn list_enum_members(&self) -> Result<Vec<EnumMember>> {
        let rows = self.client()?.query(ENUM_MEMBERS_QUERY, &[]).await?;
        let members: Vec<EnumMember> = rows
            .iter()
            .map(|row| EnumMember {
                schema: row.get(0),
                type_name: row.get(1),
                label: row.get(2),
            })
            .collect();
        debug!(
            "Loaded {} enum members across all schemas (enums are not filtered by schema)",
            members.len()
        );
        Ok(members)
    }

    async fn list_columns(
        &self,
        include_schemas: &[String],
        exclude_schemas: &[String],
        exclude_tables: &[String],
    ) -> Result<Vec<ColumnMeta>> {
        let rows = self
            .client()?
            .query(
                COLUMNS_QUERY,
                &[&include_schemas, &exclude_schemas, &exclude_tables],
            )
            .await?;

        let columns: Vec<ColumnMeta> = rows
            .iter()
            .map(|row| ColumnMeta {
                schema: row.get(0),
                table: row.get(1),
                column: row.get(2),
                nullable: row.get(3),
                default: row.get(4),
                native_type: row.get(5),
                udt_name: row.get(6),
                udt_schema: row.get(7),
            })
            .collect();
        debug!("Loaded {} columns", columns.len());
        Ok(columns)
    }

    async fn list_constraints(
        &self,
        schema: &str,
        kinds: &[ConstraintKind],
    ) -> Result<Vec<ConstraintInfo>> {
        let kinds: Vec<&str> = kinds.iter().map(ConstraintKind::as_sql).collect();
        let rows = self
            .client()?
            .query(CONSTRAINTS_QUERY, &[&schema, &kinds])
            .await?;

        let mut constraints = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind: String = row.get(2);
            match ConstraintKind::from_sql(&kind) {
                Some(kind) => constraints.push(ConstraintInfo {
                    schema: row.get(0),
                    constraint_name: row.get(1),
                    kind,
                }),
                None => debug!("Skipping constraint of type {}", kind),
            }
        }
        debug!("Loaded {} constraints for schema '{}'", constraints.len(), schema);
        Ok(constraints)
    }

    async fn list_key_usage(
        &self,
        schema: &str,
        constraint_names: &[String],
    ) -> Result<Vec<KeyUsage>> {
        let rows = self
            .client()?
            .query(KEY_USAGE_QUERY, &[&schema, &constraint_names])
            .await?;
        Ok(rows
            .iter()
            .map(|row| KeyUsage {
                schema: row.get(0),
                table: row.get(1),
                column: row.get(2),
                constraint_name: row.get(3),
            })
            .collect())
    }

    async fn list_referenced_column_usage(
        &self,
        constraint_names: &[String],
    ) -> Result<Vec<ReferencedColumn>> {
        let rows = self
            .client()?
            .query(REFERENCED_COLUMNS_QUERY, &[&constraint_names])
            .await?;
        Ok(rows
            .iter()
            .map(|row| ReferencedColumn {
                constraint_schema: row.get(0),
                schema: row.get(1),
                table: row.get(2),
                column: row.get(3),
                constraint_name: row.get(4),
            })
            .collect())
    }

    fn describe(&self) -> String {
        format!("postgres://{}", self.label)
    }

    async fn close(&mut self) {
        drop(self.client.take());
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.await {
                warn!("PostgreSQL connection task failed: {}", e);
            }
            debug!("Released connection to {}", self.label);
        }
    }
}

/// Certificate verifier that accepts any certificate.
///
/// Only reachable through `ssl_mode=require`, which encrypts the connection
/// without authenticating the server. Use `verify-full` on untrusted networks.
#[derive(Debug)]
struct NoVerifier;

impl rustls::client::danger::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &rustls::pki_types::CertificateDer<'_>,
        _intermediates: &[rustls::pki_types::CertificateDer<'_>],
        _server_name: &rustls::pki_types::ServerName<'_>,
        _ocsp_response: &[u8],
        _now: rustls::pki_types::UnixTime,
    ) -> std::result::Result<rustls::client::danger::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::danger::ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &rustls::pki_types::CertificateDer<'_>,
        _dss: &rustls::DigitallySignedStruct,
    ) -> std::result::Result<rustls::client::danger::HandshakeSignatureValid, rustls::Error> {
        Ok(rustls::client::danger::HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        vec![
            rustls::SignatureScheme::RSA_PKCS1_SHA256,
            rustls::SignatureScheme::RSA_PKCS1_SHA384,
            rustls::SignatureScheme::RSA_PKCS1_SHA512,
            rustls::SignatureScheme::ECDSA_NISTP256_SHA256,
            rustls::SignatureScheme::ECDSA_NISTP384_SHA384,
            rustls::SignatureScheme::ECDSA_NISTP521_SHA512,
            rustls::SignatureScheme::RSA_PSS_SHA256,
            rustls::SignatureScheme::RSA_PSS_SHA384,
            rustls::SignatureScheme::RSA_PSS_SHA512,
            rustls::SignatureScheme::ED25519,
        ]
    }
}
