//! Static descriptions of the six IRC stages shown next to a prediction.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDescription {
    pub stage: u8,
    pub name: &'static str,
    /// DFG range in ml/min/1,73 m².
    pub dfg_range: &'static str,
    pub description: &'static str,
    pub recommendations: &'static [&'static str],
}

pub static STAGES: [StageDescription; 6] = [
    StageDescription {
        stage: 0,
        name: "Pas d'IRC",
        dfg_range: "> 90",
        description: "Fonction rénale normale avec un DFG supérieur à 90 ml/min/1,73 m².",
        recommendations: &[
            "Maintien d'une bonne hydratation",
            "Alimentation équilibrée",
            "Exercice physique régulier",
        ],
    },
    StageDescription {
        stage: 1,
        name: "IRC légère",
        dfg_range: "60-89",
        description: "Légère diminution de la fonction rénale avec un DFG entre 60 et 89 ml/min/1,73 m².",
        recommendations: &[
            "Suivi annuel de la fonction rénale",
            "Contrôle de la pression artérielle",
            "Éviter les médicaments néphrotoxiques",
        ],
    },
    StageDescription {
        stage: 2,
        name: "IRC légère à modérée",
        dfg_range: "45-59",
        description: "Diminution modérée de la fonction rénale avec un DFG entre 45 et 59 ml/min/1,73 m².",
        recommendations: &[
            "Suivi bisannuel de la fonction rénale",
            "Surveillance de la protéinurie",
            "Ajustement de l'alimentation si nécessaire",
        ],
    },
    StageDescription {
        stage: 3,
        name: "IRC modérée à sévère",
        dfg_range: "30-44",
        description: "Le stade 3 de l'IRC correspond à une insuffisance rénale modérée avec un DFG entre 30 et 44 ml/min/1,73 m².",
        recommendations: &[
            "Contrôle de la pression artérielle",
            "Surveillance de l'anémie et de l'équilibre phosphocalcique",
            "Régime adapté et gestion des comorbidités",
        ],
    },
    StageDescription {
        stage: 4,
        name: "IRC sévère",
        dfg_range: "15-29",
        description: "Diminution sévère de la fonction rénale avec un DFG entre 15 et 29 ml/min/1,73 m².",
        recommendations: &[
            "Suivi néphrologue trimestriel",
            "Préparation potentielle à la dialyse",
            "Régime alimentaire strict",
        ],
    },
    StageDescription {
        stage: 5,
        name: "IRC terminale",
        dfg_range: "< 15",
        description: "Insuffisance rénale terminale avec un DFG inférieur à 15 ml/min/1,73 m².",
        recommendations: &[
            "Mise en place d'un traitement de suppléance",
            "Dialyse ou préparation à la transplantation",
            "Suivi intensif",
        ],
    },
];

/// Look up a stage, falling back to stage 0 for unknown values.
pub fn describe(stage: u8) -> &'static StageDescription {
    STAGES.get(usize::from(stage)).unwrap_or(&STAGES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_is_indexed_by_stage() {
        for (i, stage) in STAGES.iter().enumerate() {
            assert_eq!(usize::from(stage.stage), i);
            assert_eq!(stage.recommendations.len(), 3);
        }
    }

    #[test]
    fn test_describe_unknown_stage_falls_back() {
        assert_eq!(describe(5).name, "IRC terminale");
        assert_eq!(describe(9).stage, 0);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(describe(2)).unwrap();
        assert_eq!(json["dfgRange"], "45-59");
        assert_eq!(json["recommendations"][1], "Surveillance de la protéinurie");
    }
}
