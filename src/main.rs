fn main() {
    knockout_bracket_lib::run()
}
