#[cfg(test)]
mod tests {
    use crate::hardware::isa::LibInst;
    use crate::hardware::label::NUM_NOPS;
    use std::collections::HashSet;

    macro_rules! catalog_names {
        (
            $( $(#[$doc:meta])* $name:ident = $mnemonic:literal => $category:ident [ $( $flag:ident $( $arg:literal )? )? ], $handler:ident ),* $(,)?
        ) => {
            vec![ $( (stringify!($name), $mnemonic, stringify!($handler)) ),* ]
        };
    }

    fn catalog() -> Vec<(&'static str, &'static str, &'static str)> {
        crate::for_each_instruction!(catalog_names)
    }

    #[test]
    fn names_are_unique() {
        let entries = catalog();
        let variants: HashSet<_> = entries.iter().map(|e| e.0).collect();
        let mnemonics: HashSet<_> = entries.iter().map(|e| e.1).collect();
        assert_eq!(variants.len(), entries.len());
        assert_eq!(mnemonics.len(), entries.len());
    }

    #[test]
    fn nop_modifiers_are_contiguous_and_lead_the_catalog() {
        let mods: Vec<u8> = LibInst::ALL.iter().filter_map(|i| i.nop_mod()).collect();
        assert_eq!(mods, (0..NUM_NOPS as u8).collect::<Vec<_>>());
        for (i, inst) in LibInst::ALL.iter().take(NUM_NOPS).enumerate() {
            assert_eq!(inst.nop_mod(), Some(i as u8));
        }
    }

    #[test]
    fn exactly_one_label_instruction() {
        let labels = LibInst::ALL.iter().filter(|i| i.is_label()).count();
        assert_eq!(labels, 1);
    }

    #[test]
    fn catalog_fits_an_opcode() {
        assert!(catalog().len() <= crate::hardware::inst_set::MAX_INSTRUCTIONS);
        assert_eq!(catalog().len(), LibInst::ALL.len());
    }
}
