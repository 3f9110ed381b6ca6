//! Checks the live database against the expected tables, columns and
//! indexes, and re-applies the schema scripts to heal drift.
//!
//! Only absence is detected. Extra tables, extra columns and column types
//! are not compared.

use std::collections::BTreeSet;

use sqlx::Row;

use crate::error::StoreResult;
use crate::persistence::{Database, SCHEMA_SCRIPTS};

/// Tables and the columns each one must have.
pub const EXPECTED_TABLES: [(&str, &[&str]); 13] = [
    ("territorios", &["id", "nome", "descricao", "ultima_visita", "data_criacao"]),
    ("ruas", &["id", "territorio_id", "nome"]),
    (
        "imoveis",
        &[
            "id",
            "rua_id",
            "numero",
            "tipo",
            "nome",
            "total_unidades",
            "tipo_portaria",
            "tipo_acesso",
            "observacoes",
        ],
    ),
    ("unidades", &["id", "imovel_id", "numero", "observacoes"]),
    (
        "saidas_campo",
        &["id", "nome", "data", "dia_semana", "horario", "dirigente", "data_criacao"],
    ),
    (
        "designacoes",
        &[
            "id",
            "territorio_id",
            "saida_campo_id",
            "data_designacao",
            "data_devolucao",
            "responsavel",
            "status",
        ],
    ),
    (
        "atendimentos",
        &["id", "imovel_id", "unidade_id", "data", "resultado", "observacoes", "data_registro"],
    ),
    (
        "historico_predios_vilas",
        &["id", "imovel_id", "data", "descricao", "data_registro"],
    ),
    (
        "designacoes_predios_vilas",
        &[
            "id",
            "imovel_id",
            "responsavel",
            "saida_campo_id",
            "data_designacao",
            "data_devolucao",
            "status",
        ],
    ),
    (
        "usuarios",
        &["id", "nome", "email", "senha_hash", "nivel_permissao", "ativo", "data_criacao"],
    ),
    (
        "log_atividades",
        &["id", "usuario_id", "tipo_acao", "descricao", "data_hora", "entidade", "entidade_id"],
    ),
    (
        "notificacoes",
        &[
            "id",
            "usuario_id",
            "tipo",
            "titulo",
            "mensagem",
            "status",
            "data_criacao",
            "data_leitura",
            "link",
            "entidade",
            "entidade_id",
        ],
    ),
    (
        "relatorios",
        &["id", "nome", "tipo", "filtros", "usuario_id", "data_criacao", "ultima_execucao"],
    ),
];

/// Named indexes expected on a subset of the tables.
pub const EXPECTED_INDEXES: [(&str, &[&str]); 11] = [
    ("usuarios", &["idx_usuarios_email"]),
    ("log_atividades", &["idx_log_usuario_id", "idx_log_data_hora"]),
    ("notificacoes", &["idx_notificacoes_usuario_id", "idx_notificacoes_status"]),
    ("ruas", &["idx_ruas_territorio_id"]),
    ("imoveis", &["idx_imoveis_rua_id"]),
    ("unidades", &["idx_unidades_imovel_id"]),
    (
        "designacoes",
        &["idx_designacoes_territorio_id", "idx_designacoes_saida_campo_id"],
    ),
    ("atendimentos", &["idx_atendimentos_imovel_id"]),
    ("historico_predios_vilas", &["idx_historico_imovel_id"]),
    ("designacoes_predios_vilas", &["idx_designacoes_predios_vilas_imovel_id"]),
    (
        "relatorios",
        &["idx_relatorios_usuario_id", "idx_relatorios_tipo", "idx_relatorios_ultima_execucao"],
    ),
];

/// Outcome of [`SchemaValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    pub valid: bool,
    pub problems: Vec<String>,
}

/// Outcome of [`SchemaValidator::fix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixReport {
    pub success: bool,
    pub actions: Vec<String>,
}

pub struct SchemaValidator {
    db: Database,
}

impl SchemaValidator {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    /// Compare the live schema with [`EXPECTED_TABLES`] and [`EXPECTED_INDEXES`].
    pub async fn validate(&self) -> StoreResult<SchemaReport> {
        let mut problems = Vec::new();
        let existing = self.existing_tables().await?;

        let missing: Vec<&str> = EXPECTED_TABLES
            .iter()
            .map(|(table, _)| *table)
            .filter(|table| !existing.contains(*table))
            .collect();
        if !missing.is_empty() {
            problems.push(format!("Missing tables: {}", missing.join(", ")));
        }

        for (table, columns) in EXPECTED_TABLES {
            if !existing.contains(table) {
                continue;
            }
            let live = self.table_columns(table).await?;
            let missing: Vec<&str> = columns
                .iter()
                .copied()
                .filter(|column| !live.contains(*column))
                .collect();
            if !missing.is_empty() {
                problems.push(format!("Table '{table}': missing columns: {}", missing.join(", ")));
            }
        }

        for (table, indexes) in EXPECTED_INDEXES {
            if !existing.contains(table) {
                continue;
            }
            let live = self.table_indexes(table).await?;
            let missing: Vec<&str> = indexes
                .iter()
                .copied()
                .filter(|index| !live.contains(*index))
                .collect();
            if !missing.is_empty() {
                problems.push(format!("Table '{table}': missing indexes: {}", missing.join(", ")));
            }
        }

        if !problems.is_empty() {
            tracing::warn!(count = problems.len(), "schema problems found");
        }
        Ok(SchemaReport {
            valid: problems.is_empty(),
            problems,
        })
    }

    /// Re-run every schema script when the schema is not valid.
    ///
    /// Stops at the first script that fails. Succeeds only if a second
    /// validation comes back clean.
    pub async fn fix(&self) -> StoreResult<FixReport> {
        let mut actions = Vec::new();
        if self.validate().await?.valid {
            actions.push("Schema is already valid, nothing to do".to_string());
            return Ok(FixReport {
                success: true,
                actions,
            });
        }

        for (name, script) in SCHEMA_SCRIPTS {
            match self.db.execute_script(script).await {
                Ok(()) => {
                    tracing::info!(script = name, "schema script re-applied");
                    actions.push(format!("Applied schema script: {name}"));
                }
                Err(e) => {
                    tracing::error!(script = name, error = %e, "schema script failed");
                    actions.push(format!("Failed to apply {name}: {e}"));
                    return Ok(FixReport {
                        success: false,
                        actions,
                    });
                }
            }
        }

        let after = self.validate().await?;
        if after.valid {
            actions.push("All schema problems were fixed".to_string());
        } else {
            actions.push("Some schema problems remain:".to_string());
            actions.extend(after.problems.iter().map(|p| format!("- {p}")));
        }
        Ok(FixReport {
            success: after.valid,
            actions,
        })
    }

    async fn existing_tables(&self) -> StoreResult<BTreeSet<String>> {
        self.names(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            None,
        )
        .await
    }

    async fn table_columns(&self, table: &str) -> StoreResult<BTreeSet<String>> {
        self.names("SELECT name FROM pragma_table_info(?)", Some(table))
            .await
    }

    async fn table_indexes(&self, table: &str) -> StoreResult<BTreeSet<String>> {
        self.names(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?",
            Some(table),
        )
        .await
    }

    async fn names(&self, sql: &str, table: Option<&str>) -> StoreResult<BTreeSet<String>> {
        let params: Vec<_> = table.into_iter().map(crate::Value::from).collect();
        let rows = self.db.fetch_all(sql, &params).await?;
        let mut names = BTreeSet::new();
        for row in rows {
            names.insert(row.try_get::<String, _>("name")?);
        }
        Ok(names)
    }
}
