//! Property tests for loadout validation.

use breachline_room::{AttackTool, DefenseTool, Loadout};
use proptest::prelude::*;

fn attack_name() -> impl Strategy<Value = String> {
    prop::sample::select(AttackTool::ALL.to_vec()).prop_map(|t| t.as_str().to_string())
}

fn defense_name() -> impl Strategy<Value = String> {
    prop::sample::select(DefenseTool::ALL.to_vec()).prop_map(|t| t.as_str().to_string())
}

proptest! {
    #[test]
    fn prop_two_distinct_known_tools_are_accepted(
        attack in prop::sample::subsequence(AttackTool::ALL.to_vec(), 2),
        defense in prop::sample::subsequence(DefenseTool::ALL.to_vec(), 2),
    ) {
        let attack: Vec<&str> = attack.iter().map(|t| t.as_str()).collect();
        let defense: Vec<&str> = defense.iter().map(|t| t.as_str()).collect();
        let loadout = Loadout::parse(&attack, &defense).unwrap();
        prop_assert_ne!(loadout.attack[0], loadout.attack[1]);
        prop_assert_ne!(loadout.defense[0], loadout.defense[1]);
    }

    #[test]
    fn prop_wrong_list_length_is_rejected(
        attack in prop::collection::vec(attack_name(), 0..6),
        defense in prop::collection::vec(defense_name(), 0..6),
    ) {
        prop_assume!(attack.len() != 2 || defense.len() != 2);
        prop_assert!(Loadout::parse(&attack, &defense).is_err());
    }

    #[test]
    fn prop_repeated_tool_is_rejected(attack in attack_name(), defense in defense_name()) {
        let distinct_defense = [DefenseTool::Firewall.as_str(), DefenseTool::HoneyPot.as_str()];
        prop_assert!(Loadout::parse(&[attack.as_str(), attack.as_str()], &distinct_defense).is_err());

        let distinct_attack = [AttackTool::Worm.as_str(), AttackTool::Trojan.as_str()];
        prop_assert!(Loadout::parse(&distinct_attack, &[defense.as_str(), defense.as_str()]).is_err());
    }

    #[test]
    fn prop_unknown_tool_names_are_rejected(name in "[a-z]{1,12}") {
        prop_assume!(AttackTool::ALL.iter().all(|t| !t.as_str().eq_ignore_ascii_case(&name)));
        prop_assert!(Loadout::parse(&[name.as_str(), "Worm"], &["Firewall", "HoneyPot"]).is_err());
    }
}
