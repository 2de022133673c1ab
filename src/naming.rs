//! Harmonization of legacy bpch diagnostic names with the netCDF naming
//! convention used by current GEOS-Chem diagnostic output.
//!
//! The mapping is driven by an ordered rule table. Rules are tried in
//! declaration order and matched by substring containment; the first match
//! wins, so the order of `RULES_TABLE` is part of the contract and must not
//! be rearranged. Only the diagnostic names needed for the 1-month benchmark
//! plots are covered at this time.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::error::Error;

/// Names table (column 1 = bpch pattern, column 2 = netCDF id, column 3 =
/// action used to create the full name, column 4 = how an appended name is
/// composed, '-' when not applicable).
const RULES_TABLE: &'static str = " Pattern            NetCDF_id                     Action  Compose
\"IJ_AVG_S_\"         \"SpeciesConc\"                   append  sep
\"OD_MAP_S_OPD1550\"  \"AODDust550nm_bin1\"             replace -
\"OD_MAP_S_OPD2550\"  \"AODDust550nm_bin2\"             replace -
\"OD_MAP_S_OPD3550\"  \"AODDust550nm_bin3\"             replace -
\"OD_MAP_S_OPD4550\"  \"AODDust550nm_bin4\"             replace -
\"OD_MAP_S_OPD5550\"  \"AODDust550nm_bin5\"             replace -
\"OD_MAP_S_OPD6550\"  \"AODDust550nm_bin6\"             replace -
\"OD_MAP_S_OPD7550\"  \"AODDust550nm_bin7\"             replace -
\"OD_MAP_S_OPSO4550\" \"AODHyg550nm_SO4\"               replace -
\"OD_MAP_S_OPBC550\"  \"AODHyg550nm_BCPI\"              replace -
\"OD_MAP_S_OPOC550\"  \"AODHyg550nm_OCPI\"              replace -
\"OD_MAP_S_OPSSa550\" \"AODHyg550nm_SALA\"              replace -
\"OD_MAP_S_OPSSc550\" \"AODHyg550nm_SALC\"              replace -
\"OD_MAP_S_ODSLA\"    \"AODStratLiquidAer550nm\"        replace -
\"ACETSRCE_ACETbg\"   \"EmisACET_DirectBio\"            replace -
\"ACETSRCE_ACETmb\"   \"EmisACET_MethylBut\"            replace -
\"ACETSRCE_ACETmo\"   \"EmissACET_Monoterp\"            replace -
\"ACETSRCE_ACETop\"   \"EmissACET_Ocean\"               replace -
\"ANTHSRCE_\"         \"Anthro\"                        append  emis
\"BC_ANTH_BLKC\"      \"EmisBC_Anthro\"                 skip    -
\"BC_BIOB_BLKC\"      \"EmisBC_BioBurn\"                skip    -
\"BC_BIOF_BLKC\"      \"EmisBC_Biofuel\"                skip    -
\"BIOBSRCE_\"         \"BioBurn\"                       append  emis
\"BIOFSRCE_\"         \"Biofuel\"                       append  emis
\"BIOGSRCE_\"         \"Biogenic\"                      append  emis
\"BXHGHT_S_\"         \"Met\"                           append  sep
\"CHEM_L_S_OH\"       \"OHconcAfterChem\"               replace -
\"CHEM_L_S_HO2\"      \"HO2concAfterChem\"              replace -
\"CHEM_L_S_O1D\"      \"O1DconcAfterChem\"              replace -
\"CHEM_L_S_O\"        \"O3PconcAfterChem\"              replace -
\"CO__SRCE_COanth\"   \"EmisCO_Anthro\"                 skip    -
\"CO__SRCE_CObb\"     \"EmisCO_BioBurn\"                skip    -
\"CO__SRCE_CObf\"     \"EmisCO_Biofuel\"                skip    -
\"CO__SRCE_COmono\"   \"EmisCO_Monoterp\"               replace -
\"CO__SRCE_COship\"   \"EmisCO_Ship\"                   replace -
\"CV_FLUX_\"          \"CloudConvFlux\"                 append  -
\"DAO_3D_S_\"         \"Met\"                           append  sep
\"DAO_FLDS_PS_PBL\"   \"Met_PBLH\"                      skip    -
\"DAO_FLDS_\"         \"Met\"                           append  sep
\"DMS_BIOG_DMS\"      \"EmisDMS_Ocean\"                 replace -
\"DRYD_FLX_\"         \"DryDep\"                        append  trim2
\"DRYD_VEL_\"         \"DryDepVel\"                     append  trim2
\"DUST_SRC_\"         \"TBD\"                           skip    -
\"DUSTSRCE_DST1\"     \"EmisDST1_Natural\"              replace -
\"DUSTSRCE_DST2\"     \"EmisDST2_Natural\"              replace -
\"DUSTSRCE_DST3\"     \"EmisDST3_Natural\"              replace -
\"DUSTSRCE_DST4\"     \"EmisDST4_Natural\"              replace -
\"DXYP_DXYP\"         \"Met_AREAM2\"                    replace -
\"ECIL_SRC_\"         \"TBD\"                           skip    -
\"ECOB_SRC_\"         \"TBD\"                           skip    -
\"EW_FLX_S_\"         \"AdvFluxZonal\"                  append  sep
\"FJX_FLUX_\"         \"TBD\"                           skip    -
\"IJ_24H_S_\"         \"TBD\"                           skip    -
\"IJ_MAX_S_\"         \"TBD\"                           skip    -
\"IJ_SOA_S_\"         \"AerMass\"                       append  nosep
\"INST_MAP_\"         \"TBD\"                           skip    -
\"ISRPIA_S_ISORPH\"   \"Chem_PHSAV\"                    replace -
\"ISRPIA_S_ISORH+\"   \"Chem_HPLUSSAV\"                 replace -
\"ISRPIA_S_ISORH2O\"  \"Chem_WATERSAV\"                 replace -
\"JV_MAP_S_\"         \"JNoon\"                         append  sep
\"LFLASH_\"           \"TBD\"                           skip    -
\"NH3_ANTH_NH3\"      \"EmisNH3_Anthro\"                skip    -
\"NH3_NATU_NH3\"      \"EmisNH3_Natural\"               replace -
\"NK_EMISS_\"         \"TBD\"                           skip    -
\"MC_FRC_S_\"         \"WetLossConvFrac\"               append  sep
\"NO_AC_S_NO\"        \"EmisNO_Aircraft\"               replace -
\"NO_AN_S_NO\"        \"EmisNO_Anthro\"                 skip    -
\"NO_FERT_NO\"        \"EmisNO_Fert\"                   replace -
\"NO_LI_S_NO\"        \"EmisNO_Lightning\"              replace -
\"NO_SOIL_NO\"        \"EmisNO_Soil\"                   replace -
\"NS_FLX_S_\"         \"AdvFluxMerid\"                  append  sep
\"OC_ANTH_ORGC\"      \"EmisOC_Anthro\"                 replace -
\"OC_LIMO_LIMO\"      \"TBD\"                           skip    -
\"OC_MTPA_MTPA\"      \"TBD\"                           skip    -
\"OC_MTPO_MTPO\"      \"TBD\"                           skip    -
\"OC_SESQ_SESQ\"      \"TBD\"                           skip    -
\"OCIL_SRC_\"         \"TBD\"                           skip    -
\"OCOB_SRC_\"         \"TBD\"                           skip    -
\"OD_MAP_S_OPD\"      \"Met_OPTD\"                      replace -
\"OD_MAP_S_CLDTOT\"   \"Met_CLDF\"                      replace -
\"OD_MAP_S_OPTD\"     \"AODDust\"                       replace -
\"OD_MAP_S_SD\"       \"AerSurfAreaDust\"               replace -
\"OD_MAP_S_HGSO4\"    \"AerHygroscopicGrowth_SO4\"      replace -
\"OD_MAP_S_HGBC\"     \"AerHygroscopicGrowth_BCPI\"     replace -
\"OD_MAP_S_HGOC\"     \"AerHygroscopicGrowth_OCPI\"     replace -
\"OD_MAP_S_HGSSa\"    \"AerHygroscopicGrowth_SALA\"     replace -
\"OD_MAP_S_HGSSc\"    \"AerHygroscopicGrowth_SALC\"     replace -
\"OD_MAP_S_SSO4\"     \"AerSurfAreaHyg_SO4\"            replace -
\"OD_MAP_S_SBC\"      \"AerSurfAreaHyg_BCPI\"           replace -
\"OD_MAP_S_SOC\"      \"AerSurfAreaHyg_OCPI\"           replace -
\"OD_MAP_S_SSSa\"     \"AerSurfAreaHyg_SALA\"           replace -
\"OD_MAP_S_SSSc\"     \"AerSurfAreaHyg_SALC\"           replace -
\"OD_MAP_S_SASLA\"    \"AerSurfAreaStratLiquid\"        replace -
\"OD_MAP_S_NDSLA\"    \"AerNumDensityStratLiquid\"      replace -
\"OD_MAP_S_ODSPA\"    \"AODPolarStratCloud550nm\"       replace -
\"OD_MAP_S_SASPA\"    \"AerSurfAreaPolarStratCloud\"    replace -
\"OD_MAP_S_NDSPA\"    \"AerNumDensityStratParticulate\" replace -
\"OD_MAP_S_ISOPAOD\"  \"AODSOAfromAqIsoprene550nm\"     replace -
\"OD_MAP_S_AQAVOL\"   \"AerAqueousVolume\"              replace -
\"PBLDEPTH_\"         \"TBD\"                           skip    -
\"PEDGE_S_PSURF\"     \"TBD\"                           skip    -
\"PG_SRCE_\"          \"TBD\"                           skip    -
\"PG_PP_\"            \"TBD\"                           skip    -
\"PL_BC_S_BLKC\"      \"ProdBCPIfromBCPO\"              replace -
\"PL_OC_S_ORGC\"      \"ProdOCPIfromOCPO\"              replace -
\"PL_OC_S_ASOA\"      \"Prodfrom\"                      skip    -
\"PL_OC_S_ISOA\"      \"Prodfrom\"                      skip    -
\"PL_OC_S_TSOA\"      \"Prodfrom\"                      skip    -
\"PL_SUL_S_SO2dms\"   \"ProdSO2fromDMSandOH\"           replace -
\"PL_SUL_S_SO2no3\"   \"ProdSO2fromDMSandNO3\"          replace -
\"PL_SUL_S_SO2tot\"   \"ProdSO2fromDMS\"                replace -
\"PL_SUL_S_MSAdms\"   \"ProdMSAfromDMS\"                replace -
\"PL_SUL_S_SO4gas\"   \"ProdSO4fromGasPhase\"           replace -
\"PL_SUL_S_SO4h2o2\"  \"ProdSO4fromH2O2inCloud\"        replace -
\"PL_SUL_S_SO4o3s\"   \"ProdSO4fromO3s\"                replace -
\"PL_SUL_S_SO4o3\"    \"ProdSO4fromO3inCloud\"          replace -
\"PL_SUL_S_SO4ss\"    \"ProdSO4fromO3inSeaSalt\"        replace -
\"PL_SUL_S_SO4dust\"  \"ProdSO4fromOxidationOnDust\"    replace -
\"PL_SUL_S_NITdust\"  \"ProdNITfromHNO3uptakeOnDust\"   replace -
\"PL_SUL_S_H2SO4dus\" \"ProdSO4fromUptakeOfH2SO4g\"     replace -
\"PL_SUL_S_HNO3ss\"   \"LossHNO3onSeaSalt\"             replace -
\"PL_SUL_S_SO4hobr\"  \"ProdSO4fromHOBrInCloud\"        replace -
\"PL_SUL_S_SO4sro3\"  \"ProdSO4fromSRO3\"               replace -
\"PL_SUL_S_SO4srhob\" \"ProdSO4fromSRHObr\"             replace -
\"PORL_L_S_PCO_CH4\"  \"ProdCObyCH4\"                   skip    -
\"PORL_L_S_PCO_NMVO\" \"ProdCObyNMVOC\"                 skip    -
\"PORL_L_S_PO3\"      \"Prod_O3\"                       replace -
\"PORL_L_S_PCO\"      \"Prod_CO\"                       replace -
\"PORL_L_S_PSO4\"     \"Prod_SO4\"                      replace -
\"PORL_L_S_POx\"      \"Prod_Ox\"                       replace -
\"PORL_L_S_LO3\"      \"Loss_O3\"                       replace -
\"PORL_L_S_LCO\"      \"Loss_CO\"                       replace -
\"PORL_L_S_LOx\"      \"Loss_Ox\"                       replace -
\"RADMAP_\"           \"TBD\"                           skip    -
\"RN_SRCE_Rn\"        \"EmisRn_Soil\"                   replace -
\"RN_SRCE_Pb\"        \"PbFromRnDecay\"                 replace -
\"RN_SRCE_Be7\"       \"EmisBe_Cosmic\"                 replace -
\"RN_DECAY_\"         \"RadDecay\"                      append  sep
\"SALTSRCE_SALA\"     \"EmisSALA_Natural\"              replace -
\"SALTSRCE_SALC\"     \"EmisSALC_Natural\"              replace -
\"SHIP_SSS_\"         \"TBD\"                           skip    -
\"SO2_AC_S_SO2\"      \"EmisSO2_Aircraft\"              replace -
\"SO2_AN_S_SO2\"      \"EmisSO2_Anthro\"                skip    -
\"SO2_EV_S_SO2\"      \"EmisSO2_EVOL\"                  replace -
\"SO2_NV_S_SO2\"      \"EmisSO2_NVOL\"                  replace -
\"SO2_SHIP_SO2\"      \"EmisSO2_Ship\"                  replace -
\"SO4_AN_S_SO4\"      \"EmisSO4_Anthro\"                skip    -
\"SO4_BIOF_SO4\"      \"EmisSO4_Biofuel\"               replace -
\"SF_EMIS_\"          \"TBD\"                           skip    -
\"SS_EMIS_\"          \"TBD\"                           skip    -
\"THETA_S_THETA\"     \"Met_THETA\"                     replace -
\"TIME_TPS_TIMETROP\" \"TBD\"                           skip    -
\"TMS_COND_\"         \"TBD\"                           skip    -
\"TMS_COAG_\"         \"TBD\"                           skip    -
\"TMS_NUCL_\"         \"TBD\"                           skip    -
\"TMS_AQOX_\"         \"TBD\"                           skip    -
\"AERO_FIX_\"         \"TBD\"                           skip    -
\"TMS_SOA_\"          \"TBD\"                           skip    -
\"TR_PAUSE_TP_HGHT\"  \"Met_TropHt\"                    replace -
\"TR_PAUSE_TP_LEVEL\" \"Met_TropLev\"                   replace -
\"TR_PAUSE_TP_PRESS\" \"Met_TROPP\"                     replace -
\"UP_FLX_S_\"         \"AdvFluxVert\"                   append  sep
\"WETDCV_S_\"         \"WetLossConv\"                   append  sep
\"WETDLS_S_\"         \"WetLossLS\"                     append  sep
\"PG-PP_S_\"          \"POPS\"                          append  -
\"NH3_BIOB_NH3\"      \"EmisNH3_BioBurn\"               skip    -
\"NH3_BIOF_NH3\"      \"EmisNH3_Biofuel\"               skip    -
\"NO_BIOB_NO\"        \"EmisNO_BioBurn\"                skip    -
\"NO_BIOF_NO\"        \"EmisNO_Biofuel\"                skip    -
\"OC_BIOB_ORGC\"      \"EmisOC_BioBurn\"                skip    -
\"OC_BIOF_ORGC\"      \"EmisOC_Biofuel\"                skip    -
\"OC_BIOG_ORGC\"      \"EmisOC_Biogenic\"               skip    -
\"SO2_BIOB_SO2\"      \"EmisSO2_BioBurn\"               skip    -
\"SO2_BIOF_SO2\"      \"EmisSO2_Biofuel\"               skip    -";

/// Special variables that overwrite fully-composed candidate names.
const OVERRIDES_TABLE: &'static str = " Candidate        Final
\"AerMassPM25\"    \"PM25\"
\"AerMassbiogOA\"  \"TotalBiogenicOA\"
\"AerMasssumOA\"   \"TotalOA\"
\"AerMasssumOC\"   \"TotalOC\"
\"AerMassBNO\"     \"BetaNO\"
\"AerMassOC\"      \"OC\"
\"Met_AIRNUMDE\"   \"Met_AIRNUMDEN\"
\"Met_UWND\"       \"Met_U\"
\"Met_VWND\"       \"Met_V\"
\"Met_CLDTOP\"     \"Met_CLDTOPS\"
\"Met_GWET\"       \"Met_GWETTOP\"
\"Met_PRECON\"     \"Met_PRECCON\"
\"Met_PREACC\"     \"Met_PRECTOT\"
\"Met_PBL\"        \"Met_PBLH\"";

/// Sub-patterns that are skipped even though their parent rule is an append
/// family (these fields conflict with existing netCDF diagnostics).
const APPEND_SKIP_PATTERNS: [&str; 2] = ["DAO_FLDS_PS_PBL", "DAO_FLDS_TROPPRAW"];

/// How an append-style rule combines its netCDF fragment with the suffix
/// derived from the legacy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Composition {
    /// `fragment + "_" + suffix` (most append families)
    Sep,
    /// `fragment + suffix` (the aerosol-mass family)
    NoSep,
    /// `fragment + "_" + suffix` with the trailing 2-letter tag dropped
    /// from the suffix (dry deposition families)
    Trim2,
    /// `"Emis" + suffix + "_" + fragment` (emission-source families)
    Emis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The candidate name is exactly the rule's fragment.
    Replace,
    /// The candidate name is composed from the fragment and the trailing
    /// token of the legacy name. `None` means no composition has been
    /// defined for this family yet; matching names stay unmapped.
    Append(Option<Composition>),
    /// Deliberately excluded from the output mapping.
    Skip,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: String,
    pub fragment: String,
    pub strategy: Strategy,
}

/// The outcome of rewriting a single legacy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite<'t> {
    Mapped { pattern: &'t str, name: String },
    Skipped { pattern: &'t str },
    Unmatched,
}

/// An immutable pair of (ordered rule table, override table).
///
/// The embedded bpch-to-netCDF tables are exposed through
/// [`NameTables::bpch_to_netcdf`]; alternate table versions can be built
/// with [`NameTables::parse`] and used independently.
#[derive(Debug, Clone)]
pub struct NameTables {
    rules: Vec<Rule>,
    overrides: HashMap<String, String>,
}

impl NameTables {
    /// The standard tables mapping legacy bpch diagnostic names onto the
    /// netCDF diagnostic names.
    pub fn bpch_to_netcdf() -> &'static NameTables {
        lazy_static! {
            static ref TABLES: NameTables =
                NameTables::parse(RULES_TABLE, OVERRIDES_TABLE)
                    .expect("embedded bpch-to-netCDF name tables are malformed");
        }
        &TABLES
    }

    /// Parse a rule table and an override table from their text form. The
    /// first line of each is a header. Rule lines hold four whitespace
    /// separated columns: quoted pattern, quoted fragment, action
    /// (`append`/`replace`/`skip`) and composition
    /// (`sep`/`nosep`/`trim2`/`emis`, or `-` when not applicable).
    pub fn parse(rules_text: &str, overrides_text: &str) -> Result<NameTables, Error> {
        let mut rules = Vec::new();
        for (lineno, line) in rules_text.split('\n').enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() != 4 {
                return Err(table_err(lineno, "expected 4 columns"));
            }
            let pattern = unquote(cols[0]).ok_or_else(|| table_err(lineno, "unquoted pattern"))?;
            let fragment = unquote(cols[1]).ok_or_else(|| table_err(lineno, "unquoted netCDF id"))?;
            let compose = match cols[3] {
                "-" => None,
                "sep" => Some(Composition::Sep),
                "nosep" => Some(Composition::NoSep),
                "trim2" => Some(Composition::Trim2),
                "emis" => Some(Composition::Emis),
                other => {
                    return Err(table_err(lineno, &format!("unknown composition '{}'", other)))
                }
            };
            let strategy = match (cols[2], compose) {
                ("append", c) => Strategy::Append(c),
                ("replace", None) => Strategy::Replace,
                ("skip", None) => Strategy::Skip,
                ("replace", Some(_)) | ("skip", Some(_)) => {
                    return Err(table_err(lineno, "composition given for a non-append rule"))
                }
                (other, _) => {
                    return Err(table_err(lineno, &format!("unknown action '{}'", other)))
                }
            };
            rules.push(Rule {
                pattern: pattern.to_string(),
                fragment: fragment.to_string(),
                strategy,
            });
        }

        let mut overrides = HashMap::new();
        for (lineno, line) in overrides_text.split('\n').enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() != 2 {
                return Err(table_err(lineno, "expected 2 columns"));
            }
            let cand = unquote(cols[0]).ok_or_else(|| table_err(lineno, "unquoted candidate"))?;
            let fin = unquote(cols[1]).ok_or_else(|| table_err(lineno, "unquoted final name"))?;
            overrides.insert(cand.to_string(), fin.to_string());
        }

        // An override whose result is itself an override key would make the
        // lookup non-idempotent; reject such tables outright.
        for value in overrides.values() {
            if overrides.contains_key(value.as_str()) {
                return Err(table_err(
                    0,
                    &format!("override target '{}' is itself overridden", value),
                ));
            }
        }

        Ok(NameTables { rules, overrides })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Apply the override table to a fully-composed candidate name.
    /// Idempotent: overriding an already-overridden name is a no-op.
    pub fn apply_override(&self, candidate: String) -> String {
        match self.overrides.get(&candidate) {
            Some(fin) => fin.clone(),
            None => candidate,
        }
    }

    /// Rewrite one legacy variable name. Rules are scanned in table order
    /// and matched by substring containment; the first match wins.
    pub fn rewrite(&self, legacy: &str) -> Rewrite<'_> {
        let rule = match self.rules.iter().find(|r| legacy.contains(&r.pattern[..])) {
            Some(r) => r,
            None => return Rewrite::Unmatched,
        };

        let candidate = match rule.strategy {
            Strategy::Skip => return Rewrite::Skipped { pattern: &rule.pattern },
            Strategy::Replace => rule.fragment.clone(),
            Strategy::Append(compose) => {
                // Certain fields conflict with existing netCDF names and are
                // dropped even though their family is append-style.
                if APPEND_SKIP_PATTERNS.iter().any(|p| legacy.contains(p)) {
                    return Rewrite::Skipped { pattern: &rule.pattern };
                }
                let suffix = legacy.rsplit('_').next().unwrap_or(legacy);
                match compose {
                    Some(Composition::Sep) => format!("{}_{}", rule.fragment, suffix),
                    Some(Composition::NoSep) => format!("{}{}", rule.fragment, suffix),
                    Some(Composition::Trim2) => {
                        let trimmed = suffix
                            .get(..suffix.len().saturating_sub(2))
                            .unwrap_or("");
                        format!("{}_{}", rule.fragment, trimmed)
                    }
                    Some(Composition::Emis) => {
                        format!("Emis{}_{}", suffix, rule.fragment)
                    }
                    None => return Rewrite::Unmatched,
                }
            }
        };

        Rewrite::Mapped {
            pattern: &rule.pattern,
            name: self.apply_override(candidate),
        }
    }
}

fn unquote(field: &str) -> Option<&str> {
    field.strip_prefix('"')?.strip_suffix('"')
}

fn table_err(line: usize, reason: &str) -> Error {
    Error::Table {
        line,
        reason: reason.to_string(),
    }
}

/// The full rewrite output for one set of legacy names, in input order.
#[derive(Debug, Clone, Default)]
pub struct RenamePlan {
    renames: Vec<(String, String)>,
    skipped: Vec<(String, String)>,
    unmatched: Vec<String>,
}

impl RenamePlan {
    pub fn renames(&self) -> &[(String, String)] {
        &self.renames
    }

    pub fn skipped(&self) -> &[(String, String)] {
        &self.skipped
    }

    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    /// The final name for a legacy variable, if one was produced.
    pub fn target_for(&self, legacy: &str) -> Option<&str> {
        self.renames
            .iter()
            .find(|(old, _)| old == legacy)
            .map(|(_, new)| new.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// Print the list of bpch names and netCDF names, plus skip/unmatched
    /// diagnostics at higher verbosity.
    pub fn print_report(&self, verbosity: i8) {
        if verbosity < 0 {
            return;
        }
        println!("List of bpch names and netCDF names");
        for (old, new) in &self.renames {
            println!("{} ==> {}", pad(old, 25), pad(new, 40));
        }
        if verbosity >= 1 {
            for (name, pattern) in &self.skipped {
                println!("WARNING: skipping {} (matched '{}')", name, pattern);
            }
            for name in &self.unmatched {
                println!("WARNING: nothing defined for: {}", name);
            }
        }
        println!(
            "{} renamed, {} skipped, {} unmatched",
            self.renames.len(),
            self.skipped.len(),
            self.unmatched.len()
        );
    }
}

fn pad(s: &str, width: usize) -> String {
    format!("{:<width$}", s, width = width)
}

/// Build the legacy-to-netCDF rename plan for a sequence of variable names.
///
/// Pure function of the names and the tables; output order follows input
/// order, so the result is deterministic for a given input sequence.
pub fn build_rename_plan<I, S>(names: I, tables: &NameTables) -> RenamePlan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut plan = RenamePlan::default();
    for name in names {
        let name = name.as_ref();
        match tables.rewrite(name) {
            Rewrite::Mapped { name: new, .. } => {
                plan.renames.push((name.to_string(), new));
            }
            Rewrite::Skipped { pattern } => {
                plan.skipped.push((name.to_string(), pattern.to_string()));
            }
            Rewrite::Unmatched => {
                plan.unmatched.push(name.to_string());
            }
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> &'static NameTables {
        NameTables::bpch_to_netcdf()
    }

    #[test]
    fn append_with_separator() {
        assert_eq!(
            tables().rewrite("IJ_AVG_S_O3"),
            Rewrite::Mapped {
                pattern: "IJ_AVG_S_",
                name: "SpeciesConc_O3".to_string()
            }
        );
    }

    #[test]
    fn append_without_separator() {
        assert_eq!(
            tables().rewrite("IJ_SOA_S_SOA1"),
            Rewrite::Mapped {
                pattern: "IJ_SOA_S_",
                name: "AerMassSOA1".to_string()
            }
        );
    }

    #[test]
    fn dry_deposition_trims_two_letter_tag() {
        assert_eq!(
            tables().rewrite("DRYD_VEL_O3xx"),
            Rewrite::Mapped {
                pattern: "DRYD_VEL_",
                name: "DryDepVel_O3".to_string()
            }
        );
    }

    #[test]
    fn source_family_moves_fragment_to_the_end() {
        assert_eq!(
            tables().rewrite("BIOGSRCE_ISOP"),
            Rewrite::Mapped {
                pattern: "BIOGSRCE_",
                name: "EmisISOP_Biogenic".to_string()
            }
        );
    }

    #[test]
    fn replace_discards_the_legacy_name() {
        assert_eq!(
            tables().rewrite("OD_MAP_S_OPD1550"),
            Rewrite::Mapped {
                pattern: "OD_MAP_S_OPD1550",
                name: "AODDust550nm_bin1".to_string()
            }
        );
    }

    #[test]
    fn skip_rules_exclude_the_name() {
        assert_eq!(
            tables().rewrite("NO_AN_S_NO"),
            Rewrite::Skipped { pattern: "NO_AN_S_NO" }
        );
    }

    #[test]
    fn unknown_names_are_unmatched() {
        assert_eq!(tables().rewrite("NOT_A_DIAGNOSTIC"), Rewrite::Unmatched);
    }

    #[test]
    fn append_family_without_composition_is_unmatched() {
        // CV_FLUX_ is an append rule with no composition defined.
        assert_eq!(tables().rewrite("CV_FLUX_O3"), Rewrite::Unmatched);
    }

    #[test]
    fn conflicting_met_fields_are_skipped_inside_append() {
        assert_eq!(
            tables().rewrite("DAO_FLDS_TROPPRAW"),
            Rewrite::Skipped { pattern: "DAO_FLDS_" }
        );
        assert_eq!(
            tables().rewrite("DAO_FLDS_PS_PBL"),
            Rewrite::Skipped { pattern: "DAO_FLDS_PS_PBL" }
        );
    }

    #[test]
    fn override_is_applied_after_composition() {
        // BXHGHT_S_UWND composes to Met_UWND, which the override table
        // corrects to Met_U.
        assert_eq!(
            tables().rewrite("BXHGHT_S_UWND"),
            Rewrite::Mapped {
                pattern: "BXHGHT_S_",
                name: "Met_U".to_string()
            }
        );
    }

    #[test]
    fn override_lookup_is_idempotent() {
        let once = tables().apply_override("Met_UWND".to_string());
        let twice = tables().apply_override(once.clone());
        assert_eq!(once, "Met_U");
        assert_eq!(once, twice);
    }

    #[test]
    fn first_match_in_table_order_wins() {
        let rules_a = " Pattern NetCDF_id Action Compose
\"AAA_\" \"First\"  replace -
\"AA\"   \"Second\" replace -";
        let rules_b = " Pattern NetCDF_id Action Compose
\"AA\"   \"Second\" replace -
\"AAA_\" \"First\"  replace -";
        let empty = " Candidate Final";
        let ta = NameTables::parse(rules_a, empty).unwrap();
        let tb = NameTables::parse(rules_b, empty).unwrap();
        assert_eq!(
            ta.rewrite("AAA_X"),
            Rewrite::Mapped { pattern: "AAA_", name: "First".to_string() }
        );
        // Same name, reordered table: the other rule wins.
        assert_eq!(
            tb.rewrite("AAA_X"),
            Rewrite::Mapped { pattern: "AA", name: "Second".to_string() }
        );
    }

    #[test]
    fn embedded_tables_parse() {
        let t = tables();
        assert!(t.rules().len() > 150);
        // Spot-check declared order: the OPD1550 replace rule precedes the
        // generic OPD rule, otherwise the dust bins could never match.
        let i_bin = t.rules().iter().position(|r| r.pattern == "OD_MAP_S_OPD1550");
        let i_gen = t.rules().iter().position(|r| r.pattern == "OD_MAP_S_OPD");
        assert!(i_bin.unwrap() < i_gen.unwrap());
    }

    #[test]
    fn non_idempotent_override_table_is_rejected() {
        let rules = " Pattern NetCDF_id Action Compose";
        let overrides = " Candidate Final
\"A\" \"B\"
\"B\" \"C\"";
        assert!(NameTables::parse(rules, overrides).is_err());
    }

    #[test]
    fn plan_partitions_names_in_input_order() {
        let names = vec![
            "IJ_AVG_S_O3",
            "NO_AN_S_NO",
            "GARBAGE",
            "IJ_AVG_S_CO",
            "IJ_AVG_S_O3", // repeated input name, recomputed identically
        ];
        let plan = build_rename_plan(names, tables());
        assert_eq!(
            plan.renames(),
            &[
                ("IJ_AVG_S_O3".to_string(), "SpeciesConc_O3".to_string()),
                ("IJ_AVG_S_CO".to_string(), "SpeciesConc_CO".to_string()),
                ("IJ_AVG_S_O3".to_string(), "SpeciesConc_O3".to_string()),
            ]
        );
        assert_eq!(plan.skipped().len(), 1);
        assert_eq!(plan.unmatched(), &["GARBAGE".to_string()]);
        assert_eq!(plan.target_for("IJ_AVG_S_CO"), Some("SpeciesConc_CO"));
        assert_eq!(plan.target_for("NO_AN_S_NO"), None);
        assert_eq!(plan.target_for("GARBAGE"), None);
    }
}
