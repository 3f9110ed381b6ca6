//! Properties, units and building history.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use territory::{percentage, BuildingStatistics, Property, PropertyHistory, PropertyKind, Unit};

use super::helpers::{date_value, get_code, get_date, get_joined, get_opt_code, get_opt_timestamp};
use super::table::Table;
use super::value::Value;
use crate::error::{StoreError, StoreResult};
use crate::params;
use crate::persistence::traits::{Record, Statement};

const INSERT_UNIT: &str = "INSERT INTO unidades (imovel_id, numero) VALUES (?, ?)";

impl Record for Property {
    const ENTITY: &'static str = "Property";
    const TABLE: &'static str = "imoveis";
    const COLUMNS: &'static [&'static str] = &[
        "rua_id",
        "numero",
        "tipo",
        "nome",
        "total_unidades",
        "tipo_portaria",
        "tipo_acesso",
        "observacoes",
    ];
    const VIEW: Option<&'static str> = Some(
        "SELECT i.*, r.nome AS street_name, t.nome AS territory_name \
         FROM imoveis i \
         LEFT JOIN ruas r ON r.id = i.rua_id \
         LEFT JOIN territorios t ON t.id = r.territorio_id",
    );
    const DEFAULT_ORDER: Option<&'static str> = Some("street_name, numero");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        params![
            self.street_id,
            &self.number,
            self.kind.as_str(),
            self.name.clone(),
            self.total_units,
            self.gate.map(|g| g.as_str()),
            self.access.map(|a| a.as_str()),
            self.notes.clone(),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            street_id: row.try_get("rua_id")?,
            number: row.try_get("numero")?,
            kind: get_code(row, "tipo")?,
            name: row.try_get("nome")?,
            total_units: row.try_get("total_unidades")?,
            gate: get_opt_code(row, "tipo_portaria")?,
            access: get_opt_code(row, "tipo_acesso")?,
            notes: row.try_get("observacoes")?,
            street_name: get_joined(row, "street_name")?,
            territory_name: get_joined(row, "territory_name")?,
        })
    }

    /// A new building or village-block gets its units in the same transaction.
    fn on_insert(&self, id: i64) -> Vec<Statement> {
        self.initial_unit_labels()
            .into_iter()
            .map(|label| Statement {
                sql: INSERT_UNIT,
                params: params![id, label],
            })
            .collect()
    }
}

impl Record for Unit {
    const ENTITY: &'static str = "Unit";
    const TABLE: &'static str = "unidades";
    const COLUMNS: &'static [&'static str] = &["imovel_id", "numero", "observacoes"];
    const DEFAULT_ORDER: Option<&'static str> = Some("numero");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        params![self.property_id, &self.label, self.notes.clone()]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            property_id: row.try_get("imovel_id")?,
            label: row.try_get("numero")?,
            notes: row.try_get("observacoes")?,
        })
    }
}

impl Record for PropertyHistory {
    const ENTITY: &'static str = "Property history";
    const TABLE: &'static str = "historico_predios_vilas";
    const COLUMNS: &'static [&'static str] = &["imovel_id", "data", "descricao"];
    const DEFAULT_ORDER: Option<&'static str> = Some("data DESC, id DESC");

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.property_id),
            date_value(self.date),
            Value::from(&self.description),
        ]
    }

    fn from_row(row: &SqliteRow) -> StoreResult<Self> {
        Ok(Self {
            id: Some(row.try_get("id")?),
            property_id: row.try_get("imovel_id")?,
            date: get_date(row, "data")?,
            description: row.try_get("descricao")?,
            recorded_at: get_opt_timestamp(row, "data_registro")?,
        })
    }
}

impl Table<Property> {
    pub async fn get_by_street(&self, street_id: i64) -> StoreResult<Vec<Property>> {
        self.select_where("rua_id = ?", "numero", &[Value::Integer(street_id)])
            .await
    }

    pub async fn get_by_kind(&self, kind: PropertyKind) -> StoreResult<Vec<Property>> {
        self.select_where("tipo = ?", "street_name, numero", &params![kind.as_str()])
            .await
    }

    /// Buildings and village-blocks across all territories.
    pub async fn get_multi_unit(&self) -> StoreResult<Vec<Property>> {
        self.select_where(
            "tipo IN ('predio', 'vila')",
            "territory_name, street_name, numero",
            &[],
        )
        .await
    }

    pub async fn get_units(&self, property_id: i64) -> StoreResult<Vec<Unit>> {
        self.database()
            .table::<Unit>()
            .get_by_property(property_id)
            .await
    }

    /// Record a history note. Only buildings and village-blocks keep history.
    pub async fn add_history(&self, entry: &mut PropertyHistory) -> StoreResult<i64> {
        self.require_multi_unit(entry.property_id).await?;
        self.database()
            .table::<PropertyHistory>()
            .save(entry)
            .await
    }

    pub async fn get_history(&self, property_id: i64) -> StoreResult<Vec<PropertyHistory>> {
        self.require_multi_unit(property_id).await?;
        self.database()
            .table::<PropertyHistory>()
            .select_where("imovel_id = ?", "data DESC, id DESC", &[Value::Integer(property_id)])
            .await
    }

    async fn require_multi_unit(&self, property_id: i64) -> StoreResult<()> {
        let property = self
            .get_by_id(property_id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: Property::ENTITY,
                id: property_id,
            })?;
        if property.kind.is_multi_unit() {
            Ok(())
        } else {
            Err(StoreError::Validation(vec![format!(
                "History is only kept for buildings and village-blocks, not {}",
                property.kind
            )]))
        }
    }

    /// Unit coverage for every building and village-block.
    pub async fn building_statistics(&self) -> StoreResult<Vec<BuildingStatistics>> {
        let rows = self
            .database()
            .fetch_all(
                "SELECT i.id, i.numero, i.nome, i.tipo, \
                        r.nome AS street_name, t.nome AS territory_name, \
                        (SELECT COUNT(*) FROM unidades u WHERE u.imovel_id = i.id) AS total_units, \
                        (SELECT COUNT(DISTINCT a.unidade_id) FROM atendimentos a \
                           WHERE a.imovel_id = i.id AND a.unidade_id IS NOT NULL) AS served_units, \
                        EXISTS (SELECT 1 FROM designacoes_predios_vilas d \
                           WHERE d.imovel_id = i.id AND d.status = 'ativo') AS has_active \
                 FROM imoveis i \
                 JOIN ruas r ON r.id = i.rua_id \
                 JOIN territorios t ON t.id = r.territorio_id \
                 WHERE i.tipo IN ('predio', 'vila') \
                 ORDER BY t.nome, r.nome, i.numero",
                &[],
            )
            .await?;

        rows.iter()
            .map(|row| {
                let total_units: i64 = row.try_get("total_units")?;
                let served_units: i64 = row.try_get("served_units")?;
                Ok(BuildingStatistics {
                    property_id: row.try_get("id")?,
                    number: row.try_get("numero")?,
                    name: row.try_get("nome")?,
                    kind: get_code(row, "tipo")?,
                    street_name: row.try_get("street_name")?,
                    territory_name: row.try_get("territory_name")?,
                    total_units,
                    served_units,
                    coverage: percentage(served_units, total_units),
                    has_active_assignment: row.try_get::<i64, _>("has_active")? != 0,
                })
            })
            .collect()
    }
}

impl Table<Unit> {
    pub async fn get_by_property(&self, property_id: i64) -> StoreResult<Vec<Unit>> {
        self.select_where("imovel_id = ?", "numero", &[Value::Integer(property_id)])
            .await
    }
}
